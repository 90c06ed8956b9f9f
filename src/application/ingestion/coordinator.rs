//! Per-click orchestration: existence check, dedup, buffering, counting.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::application::ingestion::batch_accumulator::BatchAccumulator;
use crate::application::ingestion::counter_cache::CounterCache;
use crate::application::ingestion::deduplicator::Deduplicator;
use crate::application::ingestion::error::{ClickError, ProcessOutcome};
use crate::application::ingestion::message_bus::ClickHandler;
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::AdRepository;
use crate::infrastructure::telemetry;

/// Drives one click through the pipeline.
///
/// # Steps
///
/// 1. The ad must exist, otherwise [`ClickError::NotFound`]
/// 2. The fingerprint must be new, otherwise [`ProcessOutcome::Duplicate`]
/// 3. An id is assigned if missing
/// 4. The click is buffered for the bulk write
/// 5. The in-memory counter is incremented
/// 6. The durable per-ad total is incremented, best-effort
///
/// Steps 1-5 decide the result. A failure in step 6 is logged and does not
/// undo the earlier steps: the batch write is what makes the click durable.
pub struct IngestionCoordinator {
    store: Arc<dyn AdRepository>,
    dedup: Arc<Deduplicator>,
    batch: Arc<BatchAccumulator>,
    counters: Arc<CounterCache>,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn AdRepository>,
        dedup: Arc<Deduplicator>,
        batch: Arc<BatchAccumulator>,
        counters: Arc<CounterCache>,
    ) -> Self {
        Self {
            store,
            dedup,
            batch,
            counters,
        }
    }

    /// Processes one click.
    ///
    /// # Errors
    ///
    /// - [`ClickError::NotFound`] if the ad does not exist
    /// - [`ClickError::TransientStoreFailure`] if the existence check failed
    /// - [`ClickError::BufferFull`] if the click could not be buffered
    pub async fn process_click(&self, event: ClickEvent) -> Result<ProcessOutcome, ClickError> {
        let started = Instant::now();
        let ad_id = event.ad_id.clone();

        let result = self.process(event).await;

        let outcome = match &result {
            Ok(ProcessOutcome::Accepted) => "accepted",
            Ok(ProcessOutcome::Duplicate) => "duplicate",
            Err(e) => {
                telemetry::record_error(e.kind(), "coordinator");
                e.kind()
            }
        };
        telemetry::record_click(&ad_id, outcome, started.elapsed());

        result
    }

    async fn process(&self, event: ClickEvent) -> Result<ProcessOutcome, ClickError> {
        self.ensure_ad_exists(&event.ad_id).await?;

        let fingerprint = event.fingerprint();
        if !self.dedup.try_accept(&fingerprint) {
            debug!(fingerprint = %fingerprint, "Duplicate click ignored");
            return Ok(ProcessOutcome::Duplicate);
        }

        let event = event.with_id();
        let ad_id = event.ad_id.clone();
        let click_id = event.id;

        if let Err(e) = self.batch.enqueue(event).await {
            self.dedup.release(&fingerprint);
            return Err(e);
        }

        self.counters.increment(&ad_id);

        let started = Instant::now();
        match self.store.increment_ad_total(&ad_id, 1).await {
            Ok(()) => telemetry::record_db_operation("increment_ad_total", true, started.elapsed()),
            Err(e) => {
                telemetry::record_db_operation("increment_ad_total", false, started.elapsed());
                warn!(
                    ad_id = %ad_id,
                    click_id = ?click_id,
                    error = %e,
                    "Failed to increment ad total, click stays buffered"
                );
            }
        }

        Ok(ProcessOutcome::Accepted)
    }

    async fn ensure_ad_exists(&self, ad_id: &str) -> Result<(), ClickError> {
        let started = Instant::now();
        let exists = self.store.exists_ad(ad_id).await;
        telemetry::record_db_operation("exists_ad", exists.is_ok(), started.elapsed());

        if exists? {
            Ok(())
        } else {
            Err(ClickError::NotFound(ad_id.to_string()))
        }
    }
}

#[async_trait]
impl ClickHandler for IngestionCoordinator {
    async fn process_click(&self, event: ClickEvent) -> Result<ProcessOutcome, ClickError> {
        IngestionCoordinator::process_click(self, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingestion::batch_accumulator::BatchConfig;
    use crate::application::ingestion::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    use crate::domain::clock::ManualClock;
    use crate::domain::repositories::{MockAdRepository, StoreError};
    use chrono::Utc;

    struct Harness {
        coordinator: IngestionCoordinator,
        dedup: Arc<Deduplicator>,
        batch: Arc<BatchAccumulator>,
        counters: Arc<CounterCache>,
    }

    fn harness(mock_repo: MockAdRepository, max_buffered: usize) -> Harness {
        let clock = Arc::new(ManualClock::default());
        let store: Arc<dyn AdRepository> = Arc::new(mock_repo);
        let breaker = Arc::new(CircuitBreaker::new(
            "store",
            CircuitBreakerConfig::default(),
            clock.clone(),
        ));
        let dedup = Arc::new(Deduplicator::new(1_000));
        let batch = Arc::new(BatchAccumulator::new(
            store.clone(),
            breaker,
            BatchConfig {
                flush_threshold: 100,
                max_buffered,
            },
        ));
        let counters = Arc::new(CounterCache::new(clock));

        Harness {
            coordinator: IngestionCoordinator::new(
                store,
                dedup.clone(),
                batch.clone(),
                counters.clone(),
            ),
            dedup,
            batch,
            counters,
        }
    }

    fn click(ad_id: &str) -> ClickEvent {
        ClickEvent {
            id: None,
            ..ClickEvent::new(ad_id, "203.0.113.5", 10, Utc::now())
        }
    }

    #[tokio::test]
    async fn test_process_click_accepts_new_click() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo
            .expect_exists_ad()
            .withf(|ad_id| ad_id == "tech-001")
            .times(1)
            .returning(|_| Ok(true));
        mock_repo
            .expect_increment_ad_total()
            .withf(|ad_id, delta| ad_id == "tech-001" && *delta == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let h = harness(mock_repo, 1_000);

        let result = h.coordinator.process_click(click("tech-001")).await;

        assert_eq!(result.unwrap(), ProcessOutcome::Accepted);
        assert_eq!(h.counters.get("tech-001"), Some(1));
        assert_eq!(h.batch.pending(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ad_is_not_found_and_leaves_no_trace() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_exists_ad().returning(|_| Ok(false));
        mock_repo.expect_increment_ad_total().never();

        let h = harness(mock_repo, 1_000);

        let result = h.coordinator.process_click(click("ghost")).await;

        assert!(matches!(result, Err(ClickError::NotFound(id)) if id == "ghost"));
        assert!(h.dedup.is_empty());
        assert!(h.counters.get("ghost").is_none());
        assert_eq!(h.batch.pending(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_click_is_swallowed() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_exists_ad().times(2).returning(|_| Ok(true));
        mock_repo
            .expect_increment_ad_total()
            .times(1)
            .returning(|_, _| Ok(()));

        let h = harness(mock_repo, 1_000);
        let event = click("tech-001");

        let first = h.coordinator.process_click(event.clone()).await.unwrap();
        let second = h.coordinator.process_click(event).await.unwrap();

        assert_eq!(first, ProcessOutcome::Accepted);
        assert_eq!(second, ProcessOutcome::Duplicate);
        assert_eq!(h.counters.get("tech-001"), Some(1));
        assert_eq!(h.batch.pending(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_failure_is_not_fatal() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_exists_ad().returning(|_| Ok(true));
        mock_repo
            .expect_increment_ad_total()
            .returning(|_, _| Err(StoreError::Unavailable("timeout".to_string())));

        let h = harness(mock_repo, 1_000);

        let result = h.coordinator.process_click(click("tech-001")).await;

        assert_eq!(result.unwrap(), ProcessOutcome::Accepted);
        assert_eq!(h.counters.get("tech-001"), Some(1));
        assert_eq!(h.batch.pending(), 1);
    }

    #[tokio::test]
    async fn test_existence_check_failure_is_surfaced() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo
            .expect_exists_ad()
            .returning(|_| Err(StoreError::Unavailable("connection reset".to_string())));

        let h = harness(mock_repo, 1_000);

        let result = h.coordinator.process_click(click("tech-001")).await;

        assert!(matches!(result, Err(ClickError::TransientStoreFailure(_))));
        assert!(h.dedup.is_empty());
    }

    #[tokio::test]
    async fn test_buffer_full_releases_fingerprint() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_exists_ad().returning(|_| Ok(true));
        mock_repo
            .expect_bulk_insert_clicks()
            .returning(|_| Err(StoreError::Unavailable("down".to_string())));
        mock_repo
            .expect_increment_ad_total()
            .returning(|_, _| Ok(()));

        // A zero cap sends every click down the overflow path.
        let h = harness(mock_repo, 0);
        let event = click("tech-001");

        let result = h.coordinator.process_click(event.clone()).await;

        assert!(matches!(result, Err(ClickError::BufferFull { .. })));
        assert!(h.dedup.is_empty());
        assert!(h.counters.get("tech-001").is_none());
    }
}
