//! ENUMERATE and DEDUPLICATE steps.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{MigrationError, Migrator};
use crate::webex::{AccessToken, Person, Recording, RecordingPeriod};

/// Flags every recording whose id is already in storage.
pub fn mark_in_storage(recordings: &mut [Recording], stored: &HashSet<String>) {
    for recording in recordings.iter_mut() {
        recording.in_storage = stored.contains(&recording.id);
    }
}

impl Migrator {
    /// Lists the recordings of one person, resolving the host email through
    /// the directory first.
    pub async fn enumerate_person(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
        person_id: &str,
    ) -> Result<Vec<Recording>, MigrationError> {
        self.host_recordings(token, period, site_url, person_id)
            .await?
            .ok_or_else(|| MigrationError::NoHostEmail(person_id.to_string()))
    }

    /// Concatenates the recordings of every listed person. People without
    /// an email address are skipped.
    pub async fn enumerate_everyone(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
        people: &[Person],
    ) -> Result<Vec<Recording>, MigrationError> {
        let mut recordings = Vec::new();
        for person in people {
            match self.host_recordings(token, period, site_url, &person.id).await? {
                Some(found) => recordings.extend(found),
                None => warn!("Skipping {} ({}): no email address", person.display_name, person.id),
            }
        }
        info!(
            "Found {} recording(s) across {} person(s)",
            recordings.len(),
            people.len()
        );
        Ok(recordings)
    }

    /// Every recording of every person in the directory that is not in
    /// `stored` yet.
    pub async fn enumerate_bulk(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
        stored: &HashSet<String>,
    ) -> Result<Vec<Recording>, MigrationError> {
        let people = self.provider.list_people(token).await?;
        info!("Enumerating recordings of {} person(s)", people.len());

        let mut pending = Vec::new();
        for person in &people {
            let Some(found) = self.host_recordings(token, period, site_url, &person.id).await?
            else {
                warn!("Skipping {} ({}): no email address", person.display_name, person.id);
                continue;
            };
            let listed = found.len();
            let fresh: Vec<Recording> = found
                .into_iter()
                .filter(|r| !stored.contains(&r.id))
                .collect();
            debug!(
                "{}: {} recording(s), {} already stored",
                person.display_name,
                listed,
                listed - fresh.len()
            );
            pending.extend(fresh);
        }
        Ok(pending)
    }

    /// `None` when the person has no email address.
    async fn host_recordings(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
        person_id: &str,
    ) -> Result<Option<Vec<Recording>>, MigrationError> {
        let host = self.provider.host_details(token, person_id).await?;
        let Some(email) = host.primary_email() else {
            return Ok(None);
        };

        let mut recordings = self
            .provider
            .list_recordings(token, period, site_url, email)
            .await?;
        for recording in recordings.iter_mut() {
            if recording.host_email.is_empty() {
                recording.host_email = email.to_string();
            }
            if !host.display_name.is_empty() {
                recording.host_name = Some(host.display_name.clone());
            }
        }
        debug!("{} has {} recording(s) in {}", email, recordings.len(), site_url);
        Ok(Some(recordings))
    }
}
