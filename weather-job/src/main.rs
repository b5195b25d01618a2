//! Binary crate for the `weather-job` scheduled task.
//!
//! Takes no arguments: loads config, fetches the current observation for
//! the configured location and stores it as one row. Meant to be invoked
//! by a scheduler (cron, systemd timer); a non-zero exit means nothing
//! was stored.

use anyhow::Context;
use weather_core::{Config, job};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let report = job::run(&config)
        .await
        .with_context(|| format!("Weather job for '{}' failed", config.weatherstack.location))?;

    tracing::info!(
        id = report.id,
        date = %report.observation.date,
        time = %report.observation.observation_time,
        "weather job finished"
    );

    Ok(())
}
