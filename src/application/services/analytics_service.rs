//! Per-ad click analytics.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::application::ingestion::CounterCache;
use crate::domain::clock::Clock;
use crate::domain::repositories::AdRepository;
use crate::error::AppError;
use crate::utils::time_frame::parse_time_frame;

/// Time frame used when the caller does not ask for one.
pub const DEFAULT_TIME_FRAME: &str = "1h";

/// Rolling windows reported for every ad.
const STANDARD_WINDOWS: [(&str, i64); 5] = [
    ("last_1_minute", 1),
    ("last_5_minutes", 5),
    ("last_15_minutes", 15),
    ("last_1_hour", 60),
    ("last_24_hours", 24 * 60),
];

/// Analytics for a single ad.
#[derive(Debug, Clone, PartialEq)]
pub struct AdAnalytics {
    pub ad_id: String,
    /// Durable aggregate counter.
    pub total_clicks: i64,
    /// Clicks seen by this process (read-through to the durable counter).
    pub live_clicks: u64,
    /// Stored clicks per standard window, in window order.
    pub time_frames: Vec<(&'static str, i64)>,
    pub timeframe: String,
    pub timeframe_clicks: i64,
    pub generated_at: DateTime<Utc>,
}

/// Analytics across every live ad.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsOverview {
    pub total_ads: usize,
    pub timeframe: String,
    pub analytics: Vec<AdAnalytics>,
    pub generated_at: DateTime<Utc>,
}

/// Service answering click-count and time-window questions.
///
/// Window counts come from stored click rows, so clicks still waiting in the
/// batch buffer are not yet visible there; `live_clicks` includes them.
pub struct AnalyticsService {
    store: Arc<dyn AdRepository>,
    counters: Arc<CounterCache>,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(
        store: Arc<dyn AdRepository>,
        counters: Arc<CounterCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            counters,
            clock,
        }
    }

    /// Returns the hot click count for an ad.
    ///
    /// Served from the in-memory counter; on a miss falls back to the durable
    /// total without populating the counter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the ad is unknown to both.
    pub async fn click_count(&self, ad_id: &str) -> Result<u64, AppError> {
        if let Some(count) = self.counters.get(ad_id) {
            return Ok(count);
        }

        let total = self.store.get_ad_total(ad_id).await?;
        Ok(total.max(0) as u64)
    }

    /// Counts stored clicks for the ad in the trailing `window`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the window reaches past the
    /// representable date range.
    pub async fn clicks_in_window(&self, ad_id: &str, window: Duration) -> Result<i64, AppError> {
        let end = self.clock.now();
        let start = end.checked_sub_signed(window).ok_or_else(|| {
            AppError::bad_request(
                "Time frame is too long",
                json!({ "window_secs": window.num_seconds() }),
            )
        })?;

        Ok(self.store.count_clicks_in_window(ad_id, start, end).await?)
    }

    /// Builds analytics for one ad.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if `timeframe` cannot be parsed
    /// - [`AppError::NotFound`] if the ad does not exist
    pub async fn get_analytics(
        &self,
        ad_id: &str,
        timeframe: Option<&str>,
    ) -> Result<AdAnalytics, AppError> {
        let timeframe = timeframe.unwrap_or(DEFAULT_TIME_FRAME);
        let window = parse_time_frame(timeframe).map_err(|e| {
            AppError::bad_request(e.to_string(), json!({ "timeframe": timeframe }))
        })?;

        self.analytics_for(ad_id, timeframe, window).await
    }

    /// Builds analytics for every live ad.
    ///
    /// Ads whose analytics cannot be computed are skipped with a warning.
    pub async fn get_overview(&self, timeframe: Option<&str>) -> Result<AnalyticsOverview, AppError> {
        let timeframe = timeframe.unwrap_or(DEFAULT_TIME_FRAME);
        let window = parse_time_frame(timeframe).map_err(|e| {
            AppError::bad_request(e.to_string(), json!({ "timeframe": timeframe }))
        })?;

        let ads = self.store.list_ads().await?;
        let mut analytics = Vec::with_capacity(ads.len());

        for ad in &ads {
            match self.analytics_for(&ad.id, timeframe, window).await {
                Ok(entry) => analytics.push(entry),
                Err(e) => warn!(ad_id = %ad.id, error = %e, "Skipping ad in analytics overview"),
            }
        }

        Ok(AnalyticsOverview {
            total_ads: ads.len(),
            timeframe: timeframe.to_string(),
            analytics,
            generated_at: self.clock.now(),
        })
    }

    async fn analytics_for(
        &self,
        ad_id: &str,
        timeframe: &str,
        window: Duration,
    ) -> Result<AdAnalytics, AppError> {
        if !self.store.exists_ad(ad_id).await? {
            return Err(AppError::not_found(
                "Ad not found",
                json!({ "ad_id": ad_id }),
            ));
        }

        let total_clicks = self.store.get_ad_total(ad_id).await?;
        let live_clicks = self.click_count(ad_id).await?;

        let mut time_frames = Vec::with_capacity(STANDARD_WINDOWS.len());
        for (label, minutes) in STANDARD_WINDOWS {
            let count = self.clicks_in_window(ad_id, Duration::minutes(minutes)).await?;
            time_frames.push((label, count));
        }

        let timeframe_clicks = self.clicks_in_window(ad_id, window).await?;

        Ok(AdAnalytics {
            ad_id: ad_id.to_string(),
            total_clicks,
            live_clicks,
            time_frames,
            timeframe: timeframe.to_string(),
            timeframe_clicks,
            generated_at: self.clock.now(),
        })
    }
}
