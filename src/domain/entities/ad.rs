//! Ad entity and its durable click aggregate.

use chrono::{DateTime, Utc};

/// An advertisement as stored in durable storage.
///
/// `total_clicks` is a monotonically non-decreasing projection maintained by
/// the ingestion pipeline; the raw click rows are the source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct Ad {
    pub id: String,
    pub image_url: String,
    pub target_url: String,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl Ad {
    /// Creates a new Ad instance.
    pub fn new(
        id: String,
        image_url: String,
        target_url: String,
        total_clicks: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            image_url,
            target_url,
            total_clicks,
            created_at,
        }
    }
}

/// Input data for creating an ad.
#[derive(Debug, Clone)]
pub struct NewAd {
    pub id: String,
    pub image_url: String,
    pub target_url: String,
}
