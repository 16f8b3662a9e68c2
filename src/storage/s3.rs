use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::fmt;
use tracing::debug;

use super::{RecordingStore, StorageError};

#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
}

impl S3Store {
    pub async fn new(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "recording-migrator",
        );
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Self {
            client: aws_sdk_s3::Client::new(&shared),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
        }
    }
}

pub fn console_link(bucket: &str, region: &str) -> String {
    format!("https://s3.console.aws.amazon.com/s3/buckets/{bucket}?region={region}&tab=objects")
}

#[async_trait]
impl RecordingStore for S3Store {
    fn describe(&self) -> String {
        format!("S3 bucket {}", self.bucket)
    }

    fn destination(&self) -> &'static str {
        "AWS"
    }

    fn location_link(&self) -> String {
        console_link(&self.bucket, &self.region)
    }

    async fn object_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page
                .map_err(|e| StorageError::ObjectStore(DisplayErrorContext(&e).to_string()))?;
            names.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );
        }

        debug!("Listed {} object(s) in bucket {}", names.len(), self.bucket);
        Ok(names)
    }

    async fn store(&self, key: &str, content: Bytes) -> Result<(), StorageError> {
        let size = content.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(DisplayErrorContext(&e).to_string()))?;

        debug!("Put {} ({} bytes) into bucket {}", key, size, self.bucket);
        Ok(())
    }
}
