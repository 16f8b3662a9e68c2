use crate::global;
use crate::migration::TransferPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Environment variable names that override the config file.
pub mod env_keys {
    pub const CLIENT_ID: &str = "webex_integration_client_id";
    pub const CLIENT_SECRET: &str = "webex_integration_client_secret";
    pub const REDIRECT_URI: &str = "webex_integration_redirect_uri";
    pub const SCOPE: &str = "webex_integration_scope";
    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const REGION_NAME: &str = "REGION_NAME";
    pub const BUCKET_NAME: &str = "BUCKET_NAME";
    pub const DOWNLOAD_FOLDER: &str = "DOWNLOAD_FOLDER";
    pub const MIGRATE_RECORDINGS: &str = "MIGRATE_RECORDINGS";
    pub const PORT: &str = "PORT";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no storage backend configured: set AWS_ACCESS_KEY_ID + BUCKET_NAME or DOWNLOAD_FOLDER")]
    NoStorageBackend,
    #[error("AWS credentials are configured but BUCKET_NAME is empty")]
    MissingBucket,
    #[error("Webex integration setting '{0}' is empty")]
    MissingWebexSetting(&'static str),
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub webex: WebexConfig,
    pub storage: StorageConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Idle minutes before a browser session and its token are dropped
    pub session_ttl_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5500,
            session_ttl_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebexConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl Default for WebexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://webexapis.com/v1".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:5500/webexoauth".to_string(),
            scope: "spark:people_read meeting:recordings_read meeting:recordings_write meeting:preferences_read"
                .to_string(),
        }
    }
}

impl WebexConfig {
    /// Fails on the first empty setting the OAuth flow needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("scope", &self.scope),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingWebexSetting(name));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub download_folder: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Delete the Webex recording after it was stored
    pub migrate_recordings: bool,
}

impl BehaviorConfig {
    pub fn transfer_policy(&self) -> TransferPolicy {
        if self.migrate_recordings {
            TransferPolicy::Migrate
        } else {
            TransferPolicy::Copy
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Loads the config file, then applies `.env` and process environment overrides.
    pub fn load_with_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }

    /// Overrides file values with any variable `lookup` returns.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };

        set(&mut self.webex.client_id, env_keys::CLIENT_ID);
        set(&mut self.webex.client_secret, env_keys::CLIENT_SECRET);
        set(&mut self.webex.redirect_uri, env_keys::REDIRECT_URI);
        set(&mut self.webex.scope, env_keys::SCOPE);
        set(&mut self.storage.aws_access_key_id, env_keys::AWS_ACCESS_KEY_ID);
        set(
            &mut self.storage.aws_secret_access_key,
            env_keys::AWS_SECRET_ACCESS_KEY,
        );
        set(&mut self.storage.region, env_keys::REGION_NAME);
        set(&mut self.storage.bucket, env_keys::BUCKET_NAME);
        set(&mut self.storage.download_folder, env_keys::DOWNLOAD_FOLDER);

        if let Some(value) = lookup(env_keys::MIGRATE_RECORDINGS) {
            self.behavior.migrate_recordings = parse_flag(&value);
        }
        if let Some(port) = lookup(env_keys::PORT).and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "True" | "TRUE" | "1")
}
