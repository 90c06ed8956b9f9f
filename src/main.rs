//! Ad click tracker service entry point.

use ad_click_tracker::config;
use ad_click_tracker::infrastructure::telemetry;
use ad_click_tracker::server;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_from_env()?;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    config.print_summary();

    let metrics = match telemetry::install_prometheus_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
            None
        }
    };

    server::run(config, metrics).await
}
