use anyhow::Result;
use clap::Parser;
use recording_migrator::{
    app,
    cli::{handle_bulk_command, handle_config_command, handle_storage_command, Cli, CliCommand},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("recording-migrator {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Config(args)) => {
            handle_config_command(args)?;
            return Ok(());
        }
        Some(CliCommand::Storage(args)) => {
            handle_storage_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Bulk(args)) => {
            handle_bulk_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Serve) | None => {}
    }

    app::run_service().await
}
