//! Headless bulk migration.
//!
//! Runs the same pipeline as a bulk browser session, with a token supplied
//! on the command line instead of the OAuth flow.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::app::build_migrator;
use crate::cli::BulkCliArgs;
use crate::config::Config;
use crate::migration::MigrationSummary;
use crate::webex::{AccessToken, RecordingPeriod};

pub async fn handle_bulk_command(args: BulkCliArgs) -> Result<()> {
    let period = RecordingPeriod::parse(&args.from, &args.to)?;
    let config = Config::load_with_env()?;
    let migrator = build_migrator(&config).await?;
    let token = AccessToken::new(args.token);

    let site = match args.site {
        Some(site) => site,
        None => {
            let sites = migrator
                .provider()
                .list_sites(&token)
                .await
                .context("Failed to list Webex sites")?;
            match sites.iter().find(|s| s.default).or_else(|| sites.first()) {
                Some(site) => site.site_url.clone(),
                None => bail!("No Webex site available, pass --site"),
            }
        }
    };

    let pb = create_spinner();
    pb.set_message(format!(
        "{} recordings {} - {} on {} to {}...",
        migrator.policy().action_label(),
        period.from,
        period.to,
        site,
        migrator.destination()
    ));

    let result = migrator.run_bulk(&token, &period, &site).await;
    pb.finish_and_clear();

    let summary = result.context("Bulk migration failed")?;
    print_summary(&summary);
    Ok(())
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_summary(summary: &MigrationSummary) {
    println!("{}", summary.headline());
    for migrated in &summary.migrated {
        println!("  ok      {}", migrated.filename);
    }
    for failed in &summary.failed {
        println!("  failed  {} ({})", failed.id, failed.reason);
    }
    for id in &summary.delete_failed {
        println!("  kept    {} (delete from Webex failed)", id);
    }
    println!("Stored at: {}", summary.storage_link);
}
