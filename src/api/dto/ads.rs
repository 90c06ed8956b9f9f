//! DTOs for ad listing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::Ad;

#[derive(Debug, Serialize)]
pub struct AdListResponse {
    pub ads: Vec<AdItem>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct AdItem {
    pub id: String,
    pub image_url: String,
    pub target_url: String,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Ad> for AdItem {
    fn from(ad: Ad) -> Self {
        Self {
            id: ad.id,
            image_url: ad.image_url,
            target_url: ad.target_url,
            total_clicks: ad.total_clicks,
            created_at: ad.created_at,
        }
    }
}
