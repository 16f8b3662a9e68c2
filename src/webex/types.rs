//! Webex API payloads and the values the migration flow passes around.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A recording as listed by the recordings API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub host_email: String,
    /// Display name of the host, resolved during bulk enumeration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default)]
    pub time_recorded: String,
    #[serde(default)]
    pub in_storage: bool,
}

impl Recording {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: String::new(),
            host_email: String::new(),
            host_name: None,
            time_recorded: String::new(),
            in_storage: false,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_host(mut self, email: impl Into<String>) -> Self {
        self.host_email = email.into();
        self
    }
}

/// Recording metadata including the temporary download link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDetails {
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub time_recorded: String,
    #[serde(default)]
    pub temporary_direct_download_links: Option<DownloadLinks>,
}

impl RecordingDetails {
    pub fn download_link(&self) -> Option<&str> {
        self.temporary_direct_download_links
            .as_ref()
            .and_then(|links| links.recording_download_link.as_deref())
            .filter(|link| !link.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinks {
    #[serde(default)]
    pub recording_download_link: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub display_name: String,
}

impl Person {
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }
}

/// Directory details of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDetails {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub display_name: String,
}

impl HostDetails {
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(rename = "siteUrl")]
    pub site_url: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SitesResponse {
    #[serde(default)]
    pub sites: Vec<Site>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Bearer credential for the Webex API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Token that expires `expires_in_secs` after `issued_at`. A lifetime
    /// past the representable range is treated as no expiry.
    pub fn expiring(value: impl Into<String>, issued_at: DateTime<Utc>, expires_in_secs: i64) -> Self {
        Self {
            value: value.into(),
            expires_at: Duration::try_seconds(expires_in_secs)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime)),
        }
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("period start {from} is after its end {to}")]
    Reversed { from: NaiveDate, to: NaiveDate },
}

/// Inclusive range of recording days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl RecordingPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, PeriodError> {
        if from > to {
            return Err(PeriodError::Reversed { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn parse(from: &str, to: &str) -> Result<Self, PeriodError> {
        let parse = |value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| PeriodError::InvalidDate(value.to_string()))
        };
        Self::new(parse(from)?, parse(to)?)
    }

    /// Start of the first day, as the recordings API expects it.
    pub fn query_from(&self) -> String {
        format!("{}T00:00:00", self.from.format("%Y-%m-%d"))
    }

    /// End of the last day.
    pub fn query_to(&self) -> String {
        format!("{}T23:59:59", self.to.format("%Y-%m-%d"))
    }
}
