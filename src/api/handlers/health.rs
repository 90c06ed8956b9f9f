//! Handlers for health, readiness and metrics endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse, ReadyResponse};
use crate::application::ingestion::{CircuitState, HEALTH_PROBE_TIMEOUT};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: `SELECT 1` through the ad store
/// 2. **Message bus**: transport ping; direct mode counts as healthy
///
/// Both probes give up after [`HEALTH_PROBE_TIMEOUT`].
/// 3. **Circuit breaker**: degraded while open
/// 4. **Click buffer**: degraded when the buffer is at its cap
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "message_bus": { "status": "ok", "message": "redis-streams connected, 5 workers" },
///     "circuit_breaker": { "status": "ok", "message": "closed" },
///     "click_buffer": { "status": "ok", "message": "12/10000 pending" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let message_bus = check_message_bus(&state).await;
    let circuit_breaker = check_circuit_breaker(&state);
    let click_buffer = check_click_buffer(&state);

    let all_healthy = database.is_ok()
        && message_bus.is_ok()
        && circuit_breaker.is_ok()
        && click_buffer.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            message_bus,
            circuit_breaker,
            click_buffer,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match tokio::time::timeout(HEALTH_PROBE_TIMEOUT, state.store.health_check()).await {
        Ok(true) => CheckStatus::ok("Connected"),
        Ok(false) => CheckStatus::error("Database unreachable"),
        Err(_) => CheckStatus::error(format!(
            "Database probe timed out after {}s",
            HEALTH_PROBE_TIMEOUT.as_secs()
        )),
    }
}

async fn check_message_bus(state: &AppState) -> CheckStatus {
    let bus = state.pipeline.bus();

    if bus.is_direct() {
        return CheckStatus::ok("Not connected, clicks are processed directly");
    }

    if bus.health_check().await {
        CheckStatus::ok(format!(
            "{} connected, {} workers",
            bus.transport_name(),
            bus.worker_count()
        ))
    } else {
        CheckStatus::error(format!("{} unreachable", bus.transport_name()))
    }
}

fn check_circuit_breaker(state: &AppState) -> CheckStatus {
    let breaker = state.pipeline.breaker();

    match breaker.state() {
        CircuitState::Open => CheckStatus::error(format!(
            "open after {} consecutive failures",
            breaker.failures()
        )),
        other => CheckStatus::ok(other.as_str()),
    }
}

fn check_click_buffer(state: &AppState) -> CheckStatus {
    let batch = state.pipeline.batch();
    let pending = batch.pending();
    let max = batch.config().max_buffered;
    let message = format!("{}/{} pending", pending, max);

    if pending >= max {
        CheckStatus::error(message)
    } else {
        CheckStatus::ok(message)
    }
}

/// Liveness probe.
///
/// `GET /ready`
pub async fn ready_handler(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready",
        timestamp: state.clock.now(),
        service: "ad-click-tracker",
    })
}

/// Prometheus text exposition.
///
/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
