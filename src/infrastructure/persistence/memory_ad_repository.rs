//! In-process implementation of the ad repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::domain::click_event::ClickEvent;
use crate::domain::entities::{Ad, NewAd};
use crate::domain::repositories::{AdRepository, StoreError};

#[derive(Default)]
struct MemoryState {
    ads: HashMap<String, Ad>,
    clicks: Vec<ClickEvent>,
    click_ids: HashSet<Uuid>,
}

/// Ad repository kept entirely in memory.
///
/// Honours the same contract as the PostgreSQL repository: bulk inserts are
/// all-or-nothing, clicks for unknown ads are rejected and repeated click ids
/// are skipped.
#[derive(Default)]
pub struct MemoryAdRepository {
    state: RwLock<MemoryState>,
}

impl MemoryAdRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding one zero-click ad per id.
    pub fn with_ads<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::new();
        for id in ids {
            let id = id.into();
            repo.insert_ad(Ad::new(
                id.clone(),
                format!("https://cdn.example.com/{id}.png"),
                format!("https://example.com/{id}"),
                0,
                Utc::now(),
            ));
        }
        repo
    }

    pub fn insert_ad(&self, ad: Ad) {
        self.state.write().ads.insert(ad.id.clone(), ad);
    }

    /// Snapshot of every stored click, in insertion order.
    pub fn clicks(&self) -> Vec<ClickEvent> {
        self.state.read().clicks.clone()
    }

    pub fn click_count(&self) -> usize {
        self.state.read().clicks.len()
    }
}

#[async_trait]
impl AdRepository for MemoryAdRepository {
    async fn exists_ad(&self, ad_id: &str) -> Result<bool, StoreError> {
        Ok(self.state.read().ads.contains_key(ad_id))
    }

    async fn bulk_insert_clicks(&self, clicks: &[ClickEvent]) -> Result<(), StoreError> {
        let mut state = self.state.write();

        if let Some(orphan) = clicks.iter().find(|c| !state.ads.contains_key(&c.ad_id)) {
            return Err(StoreError::AdNotFound(orphan.ad_id.clone()));
        }

        for click in clicks {
            let click = click.clone().with_id();
            let Some(id) = click.id else { continue };

            if state.click_ids.insert(id) {
                state.clicks.push(click);
            }
        }

        Ok(())
    }

    async fn increment_ad_total(&self, ad_id: &str, delta: i64) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let ad = state
            .ads
            .get_mut(ad_id)
            .ok_or_else(|| StoreError::AdNotFound(ad_id.to_string()))?;

        ad.total_clicks += delta;
        Ok(())
    }

    async fn get_ad_total(&self, ad_id: &str) -> Result<i64, StoreError> {
        self.state
            .read()
            .ads
            .get(ad_id)
            .map(|ad| ad.total_clicks)
            .ok_or_else(|| StoreError::AdNotFound(ad_id.to_string()))
    }

    async fn count_clicks_in_window(
        &self,
        ad_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let count = self
            .state
            .read()
            .clicks
            .iter()
            .filter(|c| c.ad_id == ad_id && c.timestamp >= start && c.timestamp <= end)
            .count();

        Ok(count as i64)
    }

    async fn list_ads(&self) -> Result<Vec<Ad>, StoreError> {
        let mut ads: Vec<Ad> = self.state.read().ads.values().cloned().collect();
        ads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(ads)
    }

    async fn create_ad(&self, new_ad: NewAd) -> Result<Ad, StoreError> {
        let ad = Ad::new(new_ad.id, new_ad.image_url, new_ad.target_url, 0, Utc::now());
        self.insert_ad(ad.clone());
        Ok(ad)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
