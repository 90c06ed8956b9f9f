//! Repository trait for ads and their clicks.

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{Ad, NewAd};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors raised by the durable store.
///
/// Every variant is treated as transient by the ingestion pipeline: buffered
/// clicks stay buffered and the next flush retries them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ad not found: {0}")]
    AdNotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for ads, click rows and per-ad click totals.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgAdRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryAdRepository`] - in-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Returns whether a live (not deleted) ad with this id exists.
    async fn exists_ad(&self, ad_id: &str) -> Result<bool, StoreError>;

    /// Writes all clicks in one atomic bulk operation.
    ///
    /// Either every click is stored or none is. Clicks whose id is already
    /// stored are skipped, so retrying a batch never duplicates rows.
    async fn bulk_insert_clicks(&self, clicks: &[ClickEvent]) -> Result<(), StoreError>;

    /// Adds `delta` to the ad's total click counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AdNotFound`] if no row was updated.
    async fn increment_ad_total(&self, ad_id: &str, delta: i64) -> Result<(), StoreError>;

    /// Returns the ad's authoritative total click counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AdNotFound`] if the ad does not exist.
    async fn get_ad_total(&self, ad_id: &str) -> Result<i64, StoreError>;

    /// Counts stored clicks for the ad with `start <= timestamp <= end`.
    async fn count_clicks_in_window(
        &self,
        ad_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Lists all live ads, newest first.
    async fn list_ads(&self) -> Result<Vec<Ad>, StoreError>;

    /// Creates an ad with a zero click total.
    async fn create_ad(&self, new_ad: NewAd) -> Result<Ad, StoreError>;

    /// Checks if the store is reachable.
    async fn health_check(&self) -> bool;
}
