//! API route configuration.

use crate::api::handlers::{analytics_handler, ads_list_handler, click_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Click ingestion, rate limited per client by the caller.
///
/// - `POST /ads/click` - Record a click (202 Accepted)
pub fn click_routes() -> Router<AppState> {
    Router::new().route("/ads/click", post(click_handler))
}

/// Read-side routes.
///
/// - `GET /ads`           - List ads
/// - `GET /ads/analytics` - Click analytics for one ad or all ads
pub fn query_routes() -> Router<AppState> {
    Router::new()
        .route("/ads", get(ads_list_handler))
        .route("/ads/analytics", get(analytics_handler))
}
