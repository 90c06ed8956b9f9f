//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, message bus setup, the ingestion pipeline
//! and the Axum server lifecycle.

use crate::application::ingestion::Pipeline;
use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::repositories::AdRepository;
use crate::infrastructure::messaging::{MessageTransport, RedisStreamTransport, TransportError};
use crate::infrastructure::persistence::PgAdRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::{Retry, strategy::FixedInterval};

const BUS_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Message bus (or direct mode fallback)
/// - Ingestion pipeline: consumer workers and periodic flusher
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config, metrics: Option<PrometheusHandle>) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let transport = match &config.bus_url {
        Some(bus_url) => connect_bus(bus_url, &config).await,
        None => {
            tracing::info!("Message bus disabled, processing clicks directly");
            None
        }
    };

    let store: Arc<dyn AdRepository> = Arc::new(PgAdRepository::new(Arc::new(pool)));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let pipeline = Arc::new(Pipeline::new(
        config.pipeline_config(),
        store.clone(),
        transport,
        clock.clone(),
    ));
    pipeline.start().await;

    let state = AppState::new(
        pipeline.clone(),
        store,
        clock,
        metrics,
        config.behind_proxy,
    );

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Err(e) = pipeline.shutdown().await {
        tracing::error!(error = %e, "Ingestion pipeline did not shut down cleanly");
    }

    tracing::info!("Server stopped");

    Ok(())
}

/// Connects to the message bus, retrying every 2 seconds.
///
/// Returns `None` after `bus_connect_attempts` failures; the service then
/// stays in direct mode for its whole lifetime.
async fn connect_bus(bus_url: &str, config: &Config) -> Option<Arc<dyn MessageTransport>> {
    let timeout = Duration::from_secs(config.bus_connect_timeout_secs);
    let strategy = FixedInterval::new(BUS_RETRY_DELAY).take(config.bus_connect_attempts - 1);

    let result = Retry::start(strategy, || async {
        let attempt = tokio::time::timeout(timeout, RedisStreamTransport::connect(bus_url))
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Connection(format!(
                    "connection timed out after {}s",
                    timeout.as_secs()
                )))
            });

        if let Err(ref e) = attempt {
            tracing::warn!(error = %e, "Message bus connection attempt failed");
        }

        attempt
    })
    .await;

    match result {
        Ok(transport) => {
            tracing::info!("Message bus connected (redis-streams)");
            let transport: Arc<dyn MessageTransport> = Arc::new(transport);
            Some(transport)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                attempts = config.bus_connect_attempts,
                "Message bus unavailable, processing clicks directly"
            );
            None
        }
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
