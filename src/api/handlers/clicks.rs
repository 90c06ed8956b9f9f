//! Handler for click ingestion.

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
};
use std::net::SocketAddr;
use validator::Validate;

use crate::api::dto::clicks::{ClickRequest, ClickResponse};
use crate::domain::click_event::ClickEvent;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::resolve_client_ip;

/// Records an ad click.
///
/// # Endpoint
///
/// `POST /ads/click`
///
/// # Request Body
///
/// ```json
/// { "ad_id": "tech-001", "ip": "203.0.113.5", "playback_time": 12 }
/// ```
///
/// # Response
///
/// `202 Accepted`:
///
/// ```json
/// {
///   "message": "Click recorded",
///   "click_id": "7f0c1c2e-7b0e-4a57-9d43-3f4f1c6b5a10",
///   "ad_id": "tech-001",
///   "timestamp": "2024-05-01T12:00:00Z",
///   "processing": "asynchronous"
/// }
/// ```
///
/// A duplicate click is acknowledged the same way and not counted again.
///
/// # Errors
///
/// - **400**: missing `ad_id` or invalid fields
/// - **404**: unknown ad (only detectable when processed directly)
/// - **503**: the click could not be buffered or written
pub async fn click_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ClickRequest>,
) -> Result<(StatusCode, Json<ClickResponse>), AppError> {
    payload.validate()?;

    let ip = match payload.ip.filter(|ip| !ip.trim().is_empty()) {
        Some(ip) => ip,
        None => resolve_client_ip(&headers, peer, state.behind_proxy),
    };
    let timestamp = payload.timestamp.unwrap_or_else(|| state.clock.now());

    let event = ClickEvent::new(
        payload.ad_id,
        ip,
        payload.playback_time.unwrap_or(0),
        timestamp,
    );
    let click_id = event.id.unwrap_or_default();
    let ad_id = event.ad_id.clone();

    let submission = state.pipeline.ingress().submit(event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ClickResponse {
            message: "Click recorded",
            click_id,
            ad_id,
            timestamp,
            processing: submission.processing_mode(),
        }),
    ))
}
