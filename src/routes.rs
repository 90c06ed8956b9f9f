//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /ads/click`      - Click ingestion (rate limited per client IP)
//! - `GET  /ads`            - Ad listing
//! - `GET  /ads/analytics`  - Click analytics
//! - `GET  /health`         - Health check: database, bus, breaker, buffer
//! - `GET  /ready`          - Liveness probe
//! - `GET  /metrics`        - Prometheus exposition
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Metrics** - Request counters and latency histograms
//! - **Rate limiting** - Per-IP token bucket (configurable for proxy deployments)

use crate::api;
use crate::api::handlers::{health_handler, metrics_handler, ready_handler};
use crate::api::middleware::{metrics, rate_limit, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
pub fn app_router(state: AppState, behind_proxy: bool) -> Router {
    let click_router = if behind_proxy {
        api::routes::click_routes().layer(rate_limit::proxy_layer())
    } else {
        api::routes::click_routes().layer(rate_limit::layer())
    };

    Router::new()
        .merge(click_router)
        .merge(api::routes::query_routes())
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(metrics::track_metrics))
        .with_state(state)
        .layer(tracing::layer())
}
