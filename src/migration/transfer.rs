//! TRANSFER and DELETE_SOURCE steps.

use tracing::{error, info, warn};

use super::{MigrationOutcome, Migrator, TransferError};
use crate::storage::recording_key;
use crate::webex::{AccessToken, Recording, RecordingDetails};

/// How the stored object name is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyNaming {
    /// `<topic>---<id>.mp4`, used for hand-picked recordings
    Topic,
    /// `<hostName>-<timeRecorded>---<id>.mp4`, used by bulk runs
    HostAndTime,
}

impl KeyNaming {
    pub fn key_for(&self, recording: &Recording, details: &RecordingDetails) -> String {
        let label = match self {
            Self::Topic => {
                if details.topic.is_empty() {
                    recording.topic.clone()
                } else {
                    details.topic.clone()
                }
            }
            Self::HostAndTime => {
                let host = recording
                    .host_name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(&recording.host_email);
                let recorded = if details.time_recorded.is_empty() {
                    recording.time_recorded.as_str()
                } else {
                    details.time_recorded.as_str()
                };
                format!("{host}-{recorded}")
            }
        };
        recording_key(&label, &recording.id)
    }
}

impl Migrator {
    /// Copies each recording in order. A failure marks that recording and
    /// the loop moves on to the next one.
    pub async fn transfer(
        &self,
        token: &AccessToken,
        recordings: &[Recording],
        naming: KeyNaming,
    ) -> Vec<MigrationOutcome> {
        let mut outcomes = Vec::with_capacity(recordings.len());
        for (index, recording) in recordings.iter().enumerate() {
            info!(
                "Transferring recording {}/{}: {}",
                index + 1,
                recordings.len(),
                recording.id
            );
            let outcome = match self.transfer_one(token, recording, naming).await {
                Ok(filename) => {
                    info!("Stored {} as {}", recording.id, filename);
                    MigrationOutcome::Migrated {
                        id: recording.id.clone(),
                        filename,
                    }
                }
                Err(reason) => {
                    error!("Failed to transfer {}: {}", recording.id, reason);
                    MigrationOutcome::Failed {
                        id: recording.id.clone(),
                        reason,
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn transfer_one(
        &self,
        token: &AccessToken,
        recording: &Recording,
        naming: KeyNaming,
    ) -> Result<String, TransferError> {
        let details = self
            .provider
            .recording_details(token, &recording.id, &recording.host_email)
            .await
            .map_err(TransferError::Details)?;
        let link = details
            .download_link()
            .ok_or(TransferError::MissingDownloadLink)?;

        let payload = self
            .provider
            .download(link)
            .await
            .map_err(TransferError::Download)?;

        let key = naming.key_for(recording, &details);
        self.store
            .store(&key, payload)
            .await
            .map_err(TransferError::Storage)?;
        Ok(key)
    }

    /// Deletes the Webex copies of migrated recordings. Returns the deleted
    /// ids and the ids whose delete was refused.
    pub async fn delete_sources(
        &self,
        token: &AccessToken,
        recordings: &[&Recording],
    ) -> (Vec<String>, Vec<String>) {
        let mut deleted = Vec::new();
        let mut delete_failed = Vec::new();
        for recording in recordings {
            if self
                .provider
                .delete_recording(token, &recording.id, &recording.host_email)
                .await
            {
                info!("Deleted {} from Webex", recording.id);
                deleted.push(recording.id.clone());
            } else {
                warn!(
                    "Could not delete {} (host {}) from Webex",
                    recording.id, recording.host_email
                );
                delete_failed.push(recording.id.clone());
            }
        }
        (deleted, delete_failed)
    }
}
