//! Webex recordings API client.
//!
//! Provides:
//! - OAuth authorization-code exchange
//! - Site, people and recording listing
//! - Recording details (temporary download link), download and deletion

pub mod client;
pub mod oauth;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use client::WebexClient;
pub use types::{
    AccessToken, HostDetails, PeriodError, Person, Recording, RecordingDetails, RecordingPeriod,
    Site,
};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
    #[error("{endpoint} response is missing '{field}'")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The meeting-recording API the migration flow talks to.
#[async_trait]
pub trait RecordingProvider: Send + Sync {
    /// One-shot OAuth authorization-code exchange.
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError>;

    async fn list_sites(&self, token: &AccessToken) -> Result<Vec<Site>, ProviderError>;

    /// Every person in the organization directory, all pages drained.
    async fn list_people(&self, token: &AccessToken) -> Result<Vec<Person>, ProviderError>;

    async fn host_details(
        &self,
        token: &AccessToken,
        person_id: &str,
    ) -> Result<HostDetails, ProviderError>;

    /// Recordings of one host in a site. A host the caller may not read
    /// yields an empty list.
    async fn list_recordings(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
        host_email: &str,
    ) -> Result<Vec<Recording>, ProviderError>;

    async fn recording_details(
        &self,
        token: &AccessToken,
        recording_id: &str,
        host_email: &str,
    ) -> Result<RecordingDetails, ProviderError>;

    /// Fetches a temporary download link fully into memory.
    async fn download(&self, url: &str) -> Result<Bytes, ProviderError>;

    /// Returns whether the API accepted the delete.
    async fn delete_recording(&self, token: &AccessToken, recording_id: &str, host_email: &str)
        -> bool;
}
