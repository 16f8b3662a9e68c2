use crate::config::Config;
use crate::storage::{self, StorageChoice};
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

pub mod bulk;

pub use bulk::handle_bulk_command;

#[derive(Parser, Debug)]
#[command(name = "recording-migrator")]
#[command(about = "Migrate Webex meeting recordings to S3 or a local folder", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the HTTP service (default)
    Serve,
    /// Print version information
    Version,
    /// Inspect the configuration file
    Config(ConfigCliArgs),
    /// Inspect the configured storage backend
    Storage(StorageCliArgs),
    /// Migrate every not-yet-stored recording of every user without the browser flow
    Bulk(BulkCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration (file plus environment), secrets masked
    Show,
    /// Print the configuration file location
    Path,
}

#[derive(ClapArgs, Debug)]
pub struct StorageCliArgs {
    #[command(subcommand)]
    pub command: StorageCommand,
}

#[derive(Subcommand, Debug)]
pub enum StorageCommand {
    /// List the recording ids already stored
    List,
}

#[derive(ClapArgs, Debug)]
pub struct BulkCliArgs {
    /// Webex access token (falls back to WEBEX_ACCESS_TOKEN)
    #[arg(long, env = "WEBEX_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,
    /// First recording day (YYYY-MM-DD)
    #[arg(long)]
    pub from: String,
    /// Last recording day (YYYY-MM-DD)
    #[arg(long)]
    pub to: String,
    /// Site URL; defaults to the organization's default site
    #[arg(long)]
    pub site: Option<String>,
}

pub fn handle_config_command(args: ConfigCliArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
        }
        ConfigCommand::Show => {
            let config = Config::load_with_env()?;
            let masked = masked(config);
            let content =
                toml::to_string_pretty(&masked).context("Failed to serialize config")?;
            println!("{}", content);
        }
    }
    Ok(())
}

fn masked(mut config: Config) -> Config {
    for secret in [
        &mut config.webex.client_secret,
        &mut config.storage.aws_secret_access_key,
    ] {
        if !secret.is_empty() {
            *secret = "********".to_string();
        }
    }
    config
}

pub async fn handle_storage_command(args: StorageCliArgs) -> Result<()> {
    match args.command {
        StorageCommand::List => {
            let config = Config::load_with_env()?;
            let choice = StorageChoice::from_config(&config.storage)
                .context("No usable storage backend configured")?;
            let store = choice.build().await?;

            let mut keys: Vec<String> = storage::stored_keys(store.as_ref())
                .await?
                .into_iter()
                .collect();
            keys.sort();

            println!("{} ({})", store.describe(), store.location_link());
            if keys.is_empty() {
                println!("No recordings stored yet.");
            }
            for key in keys {
                println!("  {}", key);
            }
        }
    }
    Ok(())
}
