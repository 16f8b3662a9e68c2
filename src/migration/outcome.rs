//! Per-recording transfer outcomes and the run summary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;
use crate::webex::ProviderError;

/// Why one recording could not be copied.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("recording {0} is not part of the current listing")]
    NotListed(String),
    #[error("fetching recording details failed: {0}")]
    Details(#[source] ProviderError),
    #[error("recording details carry no download link")]
    MissingDownloadLink,
    #[error("download failed: {0}")]
    Download(#[source] ProviderError),
    #[error("storing failed: {0}")]
    Storage(#[source] StorageError),
}

impl TransferError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotListed(_) => "not_listed",
            Self::Details(_) => "details",
            Self::MissingDownloadLink => "missing_download_link",
            Self::Download(_) => "download",
            Self::Storage(_) => "storage",
        }
    }
}

#[derive(Debug)]
pub enum MigrationOutcome {
    Migrated { id: String, filename: String },
    Failed { id: String, reason: TransferError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratedRecording {
    pub id: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecording {
    pub id: String,
    pub kind: String,
    pub reason: String,
}

/// Result of one transfer run, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub migrated: Vec<MigratedRecording>,
    pub failed: Vec<FailedRecording>,
    /// Source recordings removed from Webex after their copy succeeded
    pub deleted: Vec<String>,
    pub delete_failed: Vec<String>,
    pub storage_link: String,
}

impl MigrationSummary {
    pub fn from_outcomes(outcomes: Vec<MigrationOutcome>, storage_link: String) -> Self {
        let mut summary = Self {
            storage_link,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                MigrationOutcome::Migrated { id, filename } => {
                    summary.migrated.push(MigratedRecording { id, filename })
                }
                MigrationOutcome::Failed { id, reason } => summary.failed.push(FailedRecording {
                    id,
                    kind: reason.kind().to_string(),
                    reason: reason.to_string(),
                }),
            }
        }
        summary
    }

    pub fn migrated_ids(&self) -> Vec<&str> {
        self.migrated.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    /// One-line report, e.g. for logs and the CLI.
    pub fn headline(&self) -> String {
        format!(
            "Copied: {}  Failed: {}  Deleted from Webex: {}",
            self.migrated.len(),
            self.failed.len(),
            self.deleted.len()
        )
    }
}
