//! DTOs for the analytics endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::services::{AdAnalytics, AnalyticsOverview};

/// Query parameters for `GET /ads/analytics`.
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Restricts the report to one ad; all ads when absent.
    pub ad_id: Option<String>,
    /// Requested window, e.g. `5m`, `1h`, `1d` (default `1h`).
    pub timeframe: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdAnalyticsResponse {
    pub ad_id: String,
    pub total_clicks: i64,
    pub live_clicks: u64,
    pub time_frames: BTreeMap<&'static str, i64>,
    pub timeframe: String,
    pub timeframe_clicks: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<AdAnalytics> for AdAnalyticsResponse {
    fn from(a: AdAnalytics) -> Self {
        Self {
            ad_id: a.ad_id,
            total_clicks: a.total_clicks,
            live_clicks: a.live_clicks,
            time_frames: a.time_frames.into_iter().collect(),
            timeframe: a.timeframe,
            timeframe_clicks: a.timeframe_clicks,
            timestamp: a.generated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsOverviewResponse {
    pub total_ads: usize,
    pub timeframe: String,
    pub analytics: Vec<AdAnalyticsResponse>,
    pub generated_at: DateTime<Utc>,
}

impl From<AnalyticsOverview> for AnalyticsOverviewResponse {
    fn from(o: AnalyticsOverview) -> Self {
        Self {
            total_ads: o.total_ads,
            timeframe: o.timeframe,
            analytics: o.analytics.into_iter().map(Into::into).collect(),
            generated_at: o.generated_at,
        }
    }
}
