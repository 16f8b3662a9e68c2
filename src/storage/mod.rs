//! Storage backends for migrated recordings.
//!
//! Recordings are stored under `<label>---<recording-id>.mp4`. The id suffix is
//! what lets a later run recognise a recording as already migrated, so every
//! backend only needs to list object names and write bytes.

pub mod local;
pub mod s3;

use crate::config::{ConfigError, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub use local::LocalFolderStore;
pub use s3::{S3Settings, S3Store};

/// Separates the free-text label from the recording id in stored names.
pub const ID_DELIMITER: &str = "---";
pub const RECORDING_EXTENSION: &str = "mp4";

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("object storage error: {0}")]
    ObjectStore(String),
    #[error("storage task failed: {0}")]
    Task(String),
}

/// A place recordings can be copied to.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Short human description for logs.
    fn describe(&self) -> String;

    /// Destination label shown in views ("AWS" or "Local").
    fn destination(&self) -> &'static str;

    /// Link shown to the user next to the migration summary.
    fn location_link(&self) -> String;

    /// Names of every stored recording object.
    async fn object_names(&self) -> Result<Vec<String>, StorageError>;

    /// Writes `content` under `key`, replacing any previous content.
    async fn store(&self, key: &str, content: Bytes) -> Result<(), StorageError>;
}

/// Builds the stored name for a recording.
///
/// Path separators in the label are replaced so a local write always lands
/// directly inside the download folder.
pub fn recording_key(label: &str, recording_id: &str) -> String {
    let label: String = label
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let label = if label.is_empty() {
        "recording".to_string()
    } else {
        label
    };
    format!("{label}{ID_DELIMITER}{recording_id}.{RECORDING_EXTENSION}")
}

/// Extracts the recording id from a stored object name.
///
/// Returns `None` when the name does not follow `<label>---<id>.<ext>`.
pub fn parse_recording_id(name: &str) -> Option<&str> {
    let file_name = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file_name,
    };
    let (_, id) = stem.rsplit_once(ID_DELIMITER)?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Maps object names to the set of recording ids they hold, skipping names
/// that do not follow the naming convention.
pub fn collect_stored_keys<I, S>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys = HashSet::new();
    for name in names {
        let name = name.as_ref();
        match parse_recording_id(name) {
            Some(id) => {
                keys.insert(id.to_string());
            }
            None => info!("Found a stored recording in the wrong format: {}", name),
        }
    }
    keys
}

/// Ids of every recording already present in `store`.
pub async fn stored_keys(store: &dyn RecordingStore) -> Result<HashSet<String>, StorageError> {
    let names = store.object_names().await?;
    let keys = collect_stored_keys(&names);
    info!(
        "{} holds {} recording(s) ({} object(s) listed)",
        store.describe(),
        keys.len(),
        names.len()
    );
    Ok(keys)
}

/// Storage backend selected once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageChoice {
    S3(S3Settings),
    LocalFolder(PathBuf),
}

impl StorageChoice {
    /// Object storage wins when an access key is configured; otherwise the
    /// download folder is used. Neither is a configuration error.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        if !config.aws_access_key_id.trim().is_empty() {
            if config.bucket.trim().is_empty() {
                return Err(ConfigError::MissingBucket);
            }
            let region = if config.region.trim().is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                config.region.trim().to_string()
            };
            return Ok(Self::S3(S3Settings {
                bucket: config.bucket.trim().to_string(),
                region,
                access_key_id: config.aws_access_key_id.trim().to_string(),
                secret_access_key: config.aws_secret_access_key.trim().to_string(),
            }));
        }

        if !config.download_folder.trim().is_empty() {
            return Ok(Self::LocalFolder(PathBuf::from(
                config.download_folder.trim(),
            )));
        }

        Err(ConfigError::NoStorageBackend)
    }

    /// Destination label shown in views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::S3(_) => "AWS",
            Self::LocalFolder(_) => "Local",
        }
    }

    pub async fn build(&self) -> anyhow::Result<Arc<dyn RecordingStore>> {
        match self {
            Self::S3(settings) => {
                info!(
                    "Using S3 storage backend (bucket={}, region={})",
                    settings.bucket, settings.region
                );
                Ok(Arc::new(S3Store::new(settings).await))
            }
            Self::LocalFolder(path) => {
                tokio::fs::create_dir_all(path).await?;
                info!("Using local folder storage backend ({:?})", path);
                Ok(Arc::new(LocalFolderStore::new(path.clone())))
            }
        }
    }
}
