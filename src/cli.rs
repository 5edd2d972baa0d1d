use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::reconcile::SyncMode;
use crate::ryot_client::RyotClient;
use crate::sync::SyncJob;

#[derive(Parser, Debug)]
#[command(about = "Fetch workout data from Ryot and store it in InfluxDB.")]
pub struct Cli {
    /// Clear all existing workout data from InfluxDB before importing.
    #[arg(long)]
    pub reset: bool,
}

impl Cli {
    pub fn mode(&self) -> SyncMode {
        if self.reset {
            SyncMode::Reset
        } else {
            SyncMode::Incremental
        }
    }
}

/// Plain text logs by default, JSON lines with `LOG_FORMAT=json`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

pub async fn cli_main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;
    let ryot = RyotClient::new(&config.graphql_api_url, &config.auth_token, config.http_timeout)
        .context("Failed to create Ryot client")?;

    let sync_job = SyncJob::new(config, ryot);
    sync_job
        .sync_workouts(args.mode())
        .await
        .context("Workout sync failed")?;

    tracing::info!("Workout processing complete.");
    Ok(())
}
