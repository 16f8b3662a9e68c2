use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

use super::{RecordingStore, StorageError, RECORDING_EXTENSION};

/// Stores recordings as files directly inside one folder.
pub struct LocalFolderStore {
    folder: PathBuf,
}

impl LocalFolderStore {
    pub fn new(folder: PathBuf) -> Self {
        Self { folder }
    }

    fn list_blocking(folder: PathBuf) -> Result<Vec<String>, StorageError> {
        if !folder.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&folder).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::Io {
                path: folder.clone(),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;

            let is_recording = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORDING_EXTENSION));
            if is_recording {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl RecordingStore for LocalFolderStore {
    fn describe(&self) -> String {
        format!("local folder {:?}", self.folder)
    }

    fn destination(&self) -> &'static str {
        "Local"
    }

    fn location_link(&self) -> String {
        format!("file://{}", self.folder.display())
    }

    async fn object_names(&self) -> Result<Vec<String>, StorageError> {
        let folder = self.folder.clone();
        tokio::task::spawn_blocking(move || Self::list_blocking(folder))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    async fn store(&self, key: &str, content: Bytes) -> Result<(), StorageError> {
        let path = self.folder.join(key);
        tokio::fs::write(&path, &content)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("Wrote {} bytes to {:?}", content.len(), path);
        Ok(())
    }
}
