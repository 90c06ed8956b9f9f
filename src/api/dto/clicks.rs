//! DTOs for the click ingestion endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Click reported by a player.
///
/// Only `ad_id` is required. `ip` defaults to the client address and
/// `timestamp` to the arrival time.
#[derive(Debug, Deserialize, Validate)]
pub struct ClickRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64, message = "ad_id is required"))]
    pub ad_id: String,

    #[validate(length(max = 45))]
    pub ip: Option<String>,

    /// Seconds of video played before the click.
    #[validate(range(min = 0))]
    #[serde(alias = "video_play_time")]
    pub playback_time: Option<i32>,

    pub timestamp: Option<DateTime<Utc>>,
}

/// Acknowledgement returned with `202 Accepted`.
#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub message: &'static str,
    pub click_id: Uuid,
    pub ad_id: String,
    pub timestamp: DateTime<Utc>,
    /// `asynchronous` when queued on the bus, `direct` when processed inline.
    pub processing: &'static str,
}
