//! Handler for listing ads.

use axum::{Json, extract::State};

use crate::api::dto::ads::{AdItem, AdListResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Lists all live ads.
///
/// # Endpoint
///
/// `GET /ads`
///
/// # Response
///
/// ```json
/// {
///   "ads": [
///     {
///       "id": "tech-001",
///       "image_url": "https://cdn.example.com/tech-001.png",
///       "target_url": "https://example.com/landing",
///       "total_clicks": 42,
///       "created_at": "2024-05-01T12:00:00Z"
///     }
///   ],
///   "count": 1
/// }
/// ```
pub async fn ads_list_handler(
    State(state): State<AppState>,
) -> Result<Json<AdListResponse>, AppError> {
    let ads: Vec<AdItem> = state
        .ad_service
        .list_ads()
        .await?
        .into_iter()
        .map(AdItem::from)
        .collect();

    Ok(Json(AdListResponse {
        count: ads.len(),
        ads,
    }))
}
