//! Recording migration pipeline.
//!
//! Manages the full migration flow:
//! select period → enumerate → deduplicate → (select recordings) → transfer
//! → (delete source) → summary
//!
//! The provider and the storage backend are injected as trait objects, so the
//! same pipeline serves the HTTP flow, the headless CLI run and the tests.

pub mod enumerate;
pub mod outcome;
pub mod steps;
pub mod transfer;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::storage::{self, RecordingStore, StorageError};
use crate::webex::{AccessToken, PeriodError, ProviderError, RecordingPeriod, RecordingProvider};

pub use enumerate::mark_in_storage;
pub use outcome::{
    FailedRecording, MigratedRecording, MigrationOutcome, MigrationSummary, TransferError,
};
pub use transfer::KeyNaming;

/// Whether the Webex recording is deleted after a successful copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferPolicy {
    Copy,
    Migrate,
}

impl TransferPolicy {
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Migrate => "Migrate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowMode {
    /// Every not-yet-stored recording of every user, no manual selection
    Bulk,
    /// The user picks which listed recordings to transfer
    Interactive,
}

impl WorkflowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Interactive => "interactive",
        }
    }
}

/// Phase of a session's migration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Login,
    SelectPeriod,
    Enumerate,
    Deduplicate,
    SelectRecordings,
    Transfer,
    DeleteSource,
    Summary,
}

impl MigrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SelectPeriod => "select_period",
            Self::Enumerate => "enumerate",
            Self::Deduplicate => "deduplicate",
            Self::SelectRecordings => "select_recordings",
            Self::Transfer => "transfer",
            Self::DeleteSource => "delete_source",
            Self::Summary => "summary",
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("not logged in to Webex")]
    NotAuthenticated,
    #[error("Webex access token expired, please log in again")]
    TokenExpired,
    #[error("cannot {action} while the session is in phase '{phase}'")]
    InvalidStep {
        action: &'static str,
        phase: &'static str,
    },
    #[error("OAuth state mismatch, please restart the login")]
    StateMismatch,
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error("person {0} has no email address")]
    NoHostEmail(String),
    #[error("Webex API error: {0}")]
    Provider(#[from] ProviderError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct Migrator {
    provider: Arc<dyn RecordingProvider>,
    store: Arc<dyn RecordingStore>,
    policy: TransferPolicy,
}

impl Migrator {
    pub fn new(
        provider: Arc<dyn RecordingProvider>,
        store: Arc<dyn RecordingStore>,
        policy: TransferPolicy,
    ) -> Self {
        Self {
            provider,
            store,
            policy,
        }
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    pub fn provider(&self) -> &dyn RecordingProvider {
        self.provider.as_ref()
    }

    pub fn store(&self) -> &dyn RecordingStore {
        self.store.as_ref()
    }

    pub fn destination(&self) -> &'static str {
        self.store.destination()
    }

    /// Snapshot of recording ids already in storage.
    pub async fn stored_keys(&self) -> Result<HashSet<String>, StorageError> {
        storage::stored_keys(self.store.as_ref()).await
    }

    /// Bulk pipeline: snapshot storage, enumerate everyone's recordings not
    /// yet stored, transfer them all, then delete sources under the migrate
    /// policy.
    pub async fn run_bulk(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
    ) -> Result<MigrationSummary, MigrationError> {
        let stored = self.stored_keys().await?;
        info!("Stored recordings before bulk run: {}", stored.len());

        let pending = self.enumerate_bulk(token, period, site_url, &stored).await?;
        info!(
            "Retrieved {} recording(s) not already stored for bulk processing",
            pending.len()
        );

        let outcomes = self.transfer(token, &pending, KeyNaming::HostAndTime).await;
        Ok(self.finish(token, &pending, outcomes).await)
    }

    /// Deletes sources of migrated recordings when the policy asks for it and
    /// assembles the summary.
    pub async fn finish(
        &self,
        token: &AccessToken,
        recordings: &[crate::webex::Recording],
        outcomes: Vec<MigrationOutcome>,
    ) -> MigrationSummary {
        let mut summary = MigrationSummary::from_outcomes(outcomes, self.store.location_link());

        if self.policy == TransferPolicy::Migrate {
            let migrated: HashSet<&str> = summary.migrated_ids().into_iter().collect();
            let to_delete: Vec<&crate::webex::Recording> = recordings
                .iter()
                .filter(|r| migrated.contains(r.id.as_str()))
                .collect();
            let (deleted, delete_failed) = self.delete_sources(token, &to_delete).await;
            summary.deleted = deleted;
            summary.delete_failed = delete_failed;
        }

        info!("{}", summary.headline());
        summary
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory provider and store used by the pipeline tests.

    use super::*;
    use crate::webex::{HostDetails, Person, Recording, RecordingDetails, Site};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeProvider {
        pub sites: Vec<Site>,
        pub people: Vec<Person>,
        /// host email -> recordings
        pub recordings: HashMap<String, Vec<Recording>>,
        /// host emails answering 401
        pub unauthorized_hosts: HashSet<String>,
        pub failing_details: HashSet<String>,
        pub failing_deletes: HashSet<String>,
        pub details_calls: Mutex<Vec<String>>,
        pub delete_calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeProvider {
        pub fn with_person(mut self, id: &str, email: &str, name: &str) -> Self {
            self.people.push(Person {
                id: id.to_string(),
                emails: vec![email.to_string()],
                display_name: name.to_string(),
            });
            self
        }

        pub fn with_recording(mut self, host_email: &str, id: &str, topic: &str) -> Self {
            self.recordings
                .entry(host_email.to_string())
                .or_default()
                .push(Recording::new(id).with_topic(topic).with_host(host_email));
            self
        }
    }

    fn status_error(endpoint: &str, status: u16) -> ProviderError {
        ProviderError::Status {
            endpoint: endpoint.to_string(),
            status,
            body: String::new(),
        }
    }

    #[async_trait]
    impl RecordingProvider for FakeProvider {
        async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError> {
            if code == "good-code" {
                Ok(AccessToken::new("token"))
            } else {
                Err(status_error("/access_token", 400))
            }
        }

        async fn list_sites(&self, _token: &AccessToken) -> Result<Vec<Site>, ProviderError> {
            Ok(self.sites.clone())
        }

        async fn list_people(&self, _token: &AccessToken) -> Result<Vec<Person>, ProviderError> {
            Ok(self.people.clone())
        }

        async fn host_details(
            &self,
            _token: &AccessToken,
            person_id: &str,
        ) -> Result<HostDetails, ProviderError> {
            self.people
                .iter()
                .find(|p| p.id == person_id)
                .map(|p| HostDetails {
                    emails: p.emails.clone(),
                    display_name: p.display_name.clone(),
                })
                .ok_or_else(|| status_error("/people", 404))
        }

        async fn list_recordings(
            &self,
            _token: &AccessToken,
            _period: &RecordingPeriod,
            _site_url: &str,
            host_email: &str,
        ) -> Result<Vec<Recording>, ProviderError> {
            if self.unauthorized_hosts.contains(host_email) {
                return Ok(Vec::new());
            }
            Ok(self.recordings.get(host_email).cloned().unwrap_or_default())
        }

        async fn recording_details(
            &self,
            _token: &AccessToken,
            recording_id: &str,
            _host_email: &str,
        ) -> Result<RecordingDetails, ProviderError> {
            self.details_calls
                .lock()
                .unwrap()
                .push(recording_id.to_string());
            if self.failing_details.contains(recording_id) {
                return Err(status_error("/recordings", 500));
            }
            let recording = self
                .recordings
                .values()
                .flatten()
                .find(|r| r.id == recording_id)
                .ok_or_else(|| status_error("/recordings", 404))?;
            Ok(RecordingDetails {
                id: recording.id.clone(),
                topic: recording.topic.clone(),
                time_recorded: "2022-05-01T10:00:00Z".to_string(),
                temporary_direct_download_links: Some(crate::webex::types::DownloadLinks {
                    recording_download_link: Some(format!("https://download/{}", recording.id)),
                    expiration: None,
                }),
            })
        }

        async fn download(&self, url: &str) -> Result<Bytes, ProviderError> {
            Ok(Bytes::from(format!("payload of {url}")))
        }

        async fn delete_recording(
            &self,
            _token: &AccessToken,
            recording_id: &str,
            host_email: &str,
        ) -> bool {
            self.delete_calls
                .lock()
                .unwrap()
                .push((recording_id.to_string(), host_email.to_string()));
            !self.failing_deletes.contains(recording_id)
        }
    }

    #[derive(Default)]
    pub struct MemoryStore {
        pub objects: Mutex<HashMap<String, Bytes>>,
        pub failing_keys: HashSet<String>,
    }

    impl MemoryStore {
        pub fn with_objects(names: &[&str]) -> Self {
            let store = Self::default();
            {
                let mut objects = store.objects.lock().unwrap();
                for name in names {
                    objects.insert(name.to_string(), Bytes::new());
                }
            }
            store
        }

        pub fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            names.sort();
            names
        }
    }

    #[async_trait]
    impl RecordingStore for MemoryStore {
        fn describe(&self) -> String {
            "memory store".to_string()
        }

        fn destination(&self) -> &'static str {
            "Local"
        }

        fn location_link(&self) -> String {
            "memory://".to_string()
        }

        async fn object_names(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.names())
        }

        async fn store(&self, key: &str, content: Bytes) -> Result<(), StorageError> {
            if self.failing_keys.contains(key) {
                return Err(StorageError::ObjectStore(format!("refused {key}")));
            }
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), content);
            Ok(())
        }
    }
}
