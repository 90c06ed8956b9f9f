//! Handler for click analytics.

use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};

use crate::api::dto::analytics::{
    AdAnalyticsResponse, AnalyticsOverviewResponse, AnalyticsQuery,
};
use crate::error::AppError;
use crate::state::AppState;

/// Returns click analytics for one ad or for every ad.
///
/// # Endpoint
///
/// `GET /ads/analytics?ad_id=tech-001&timeframe=15m`
///
/// # Query Parameters
///
/// - `ad_id` - single ad; omitted for an overview of all ads
/// - `timeframe` - requested window (default `1h`), e.g. `30s`, `5m`, `2h`, `1d`
///
/// # Response (single ad)
///
/// ```json
/// {
///   "ad_id": "tech-001",
///   "total_clicks": 120,
///   "live_clicks": 121,
///   "time_frames": {
///     "last_1_minute": 2,
///     "last_5_minutes": 9,
///     "last_15_minutes": 20,
///     "last_1_hour": 51,
///     "last_24_hours": 120
///   },
///   "timeframe": "15m",
///   "timeframe_clicks": 20,
///   "timestamp": "2024-05-01T12:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - **400**: unparseable `timeframe`
/// - **404**: unknown `ad_id`
pub async fn analytics_handler(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, AppError> {
    let timeframe = query.timeframe.as_deref();

    match query.ad_id.as_deref().filter(|id| !id.is_empty()) {
        Some(ad_id) => {
            let analytics = state
                .analytics_service
                .get_analytics(ad_id, timeframe)
                .await?;
            Ok(Json(AdAnalyticsResponse::from(analytics)).into_response())
        }
        None => {
            let overview = state.analytics_service.get_overview(timeframe).await?;
            Ok(Json(AnalyticsOverviewResponse::from(overview)).into_response())
        }
    }
}
