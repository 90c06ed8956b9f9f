//! Assembly and lifecycle of the ingestion pipeline.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::ingestion::batch_accumulator::{BatchAccumulator, BatchConfig};
use crate::application::ingestion::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::application::ingestion::counter_cache::CounterCache;
use crate::application::ingestion::coordinator::IngestionCoordinator;
use crate::application::ingestion::deduplicator::Deduplicator;
use crate::application::ingestion::error::ClickError;
use crate::application::ingestion::ingress::ClickIngress;
use crate::application::ingestion::message_bus::{ClickHandler, MessageBus};
use crate::domain::clock::Clock;
use crate::domain::repositories::AdRepository;
use crate::infrastructure::messaging::MessageTransport;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub breaker: CircuitBreakerConfig,
    pub batch: BatchConfig,
    pub dedup_capacity: usize,
    pub flush_interval: Duration,
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            breaker: CircuitBreakerConfig::default(),
            batch: BatchConfig::default(),
            dedup_capacity: 1_000_000,
            flush_interval: Duration::from_secs(5),
            workers: 5,
        }
    }
}

/// Every ingestion component, wired together, plus its background tasks.
///
/// Built once at startup. [`Pipeline::start`] launches the consumer workers
/// and the periodic flusher; [`Pipeline::shutdown`] stops them and drains the
/// buffer.
pub struct Pipeline {
    config: PipelineConfig,
    breaker: Arc<CircuitBreaker>,
    dedup: Arc<Deduplicator>,
    counters: Arc<CounterCache>,
    batch: Arc<BatchAccumulator>,
    coordinator: Arc<IngestionCoordinator>,
    bus: Arc<MessageBus>,
    ingress: Arc<ClickIngress>,
    shutdown: CancellationToken,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// Builds the pipeline. `transport: None` means the bus never connected
    /// and every click is processed synchronously.
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn AdRepository>,
        transport: Option<Arc<dyn MessageTransport>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(
            "click_store",
            config.breaker.clone(),
            clock.clone(),
        ));
        let dedup = Arc::new(Deduplicator::new(config.dedup_capacity));
        let counters = Arc::new(CounterCache::new(clock));
        let batch = Arc::new(BatchAccumulator::new(
            store.clone(),
            breaker.clone(),
            config.batch.clone(),
        ));
        let coordinator = Arc::new(IngestionCoordinator::new(
            store,
            dedup.clone(),
            batch.clone(),
            counters.clone(),
        ));
        let bus = Arc::new(match transport {
            Some(transport) => MessageBus::new(transport),
            None => MessageBus::direct(),
        });
        let ingress = Arc::new(ClickIngress::new(bus.clone(), coordinator.clone()));

        Self {
            config,
            breaker,
            dedup,
            counters,
            batch,
            coordinator,
            bus,
            ingress,
            shutdown: CancellationToken::new(),
            flusher: Mutex::new(None),
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn dedup(&self) -> &Arc<Deduplicator> {
        &self.dedup
    }

    pub fn counters(&self) -> &Arc<CounterCache> {
        &self.counters
    }

    pub fn batch(&self) -> &Arc<BatchAccumulator> {
        &self.batch
    }

    pub fn coordinator(&self) -> &Arc<IngestionCoordinator> {
        &self.coordinator
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn ingress(&self) -> &Arc<ClickIngress> {
        &self.ingress
    }

    /// Starts the consumer workers and the periodic flusher.
    ///
    /// If the consumers cannot be started the bus drops to direct mode and
    /// the pipeline keeps running with synchronous processing.
    pub async fn start(&self) {
        let handler: Arc<dyn ClickHandler> = self.coordinator.clone();
        if let Err(e) = self.bus.start_consumers(handler, self.config.workers).await {
            warn!(error = %e, "Click consumers unavailable, processing clicks directly");
        }

        let mut flusher = self.flusher.lock();
        if flusher.is_none() {
            *flusher = Some(tokio::spawn(run_flusher(
                self.batch.clone(),
                self.config.flush_interval,
                self.shutdown.child_token(),
            )));
            info!(
                interval_secs = self.config.flush_interval.as_secs(),
                "Periodic click flusher started"
            );
        }
    }

    /// Stops background work and writes whatever is still buffered.
    ///
    /// Returns the number of clicks written by the final drain.
    ///
    /// # Errors
    ///
    /// Returns the store error if the final drain fails; the clicks still
    /// buffered at that point are lost when the process exits.
    pub async fn shutdown(&self) -> Result<usize, ClickError> {
        info!("Shutting down ingestion pipeline");

        self.bus.shutdown().await;

        self.shutdown.cancel();
        let flusher = self.flusher.lock().take();
        if let Some(handle) = flusher
            && let Err(e) = handle.await
        {
            error!(error = %e, "Click flusher terminated abnormally");
        }

        match self.batch.drain().await {
            Ok(written) => {
                info!(written, "Final click flush complete");
                Ok(written)
            }
            Err(e) => {
                error!(
                    error = %e,
                    pending = self.batch.pending(),
                    "Final click flush failed, buffered clicks will be lost"
                );
                Err(e)
            }
        }
    }
}

async fn run_flusher(batch: Arc<BatchAccumulator>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match batch.flush_now().await {
            Ok(0) => {}
            Ok(written) => debug!(written, "Periodic click flush"),
            Err(ClickError::CircuitOpen) => {
                debug!(pending = batch.pending(), "Periodic flush skipped, circuit open");
            }
            Err(e) => warn!(error = %e, pending = batch.pending(), "Periodic flush failed"),
        }
    }

    debug!("Click flusher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::repositories::MockAdRepository;

    fn config() -> PipelineConfig {
        PipelineConfig {
            flush_interval: Duration::from_secs(5),
            workers: 2,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flusher_writes_on_interval() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_exists_ad().returning(|_| Ok(true));
        mock_repo.expect_increment_ad_total().returning(|_, _| Ok(()));
        mock_repo
            .expect_bulk_insert_clicks()
            .withf(|clicks| clicks.len() == 1)
            .times(1)
            .returning(|_| Ok(()));

        let pipeline = Pipeline::new(
            config(),
            Arc::new(mock_repo),
            None,
            Arc::new(ManualClock::default()),
        );
        pipeline.start().await;

        let event = crate::domain::click_event::ClickEvent::new(
            "tech-001",
            "203.0.113.5",
            0,
            chrono::Utc::now(),
        );
        pipeline.coordinator().process_click(event).await.unwrap();
        assert_eq!(pipeline.batch().pending(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(pipeline.batch().pending(), 0);
        assert_eq!(pipeline.shutdown().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_drains_buffer() {
        let mut mock_repo = MockAdRepository::new();
        mock_repo.expect_exists_ad().returning(|_| Ok(true));
        mock_repo.expect_increment_ad_total().returning(|_, _| Ok(()));
        mock_repo
            .expect_bulk_insert_clicks()
            .withf(|clicks| clicks.len() == 2)
            .times(1)
            .returning(|_| Ok(()));

        let pipeline = Pipeline::new(
            config(),
            Arc::new(mock_repo),
            None,
            Arc::new(ManualClock::default()),
        );
        pipeline.start().await;

        for ip in ["203.0.113.5", "203.0.113.6"] {
            let event = crate::domain::click_event::ClickEvent::new(
                "tech-001",
                ip,
                0,
                chrono::Utc::now(),
            );
            pipeline.coordinator().process_click(event).await.unwrap();
        }

        assert_eq!(pipeline.shutdown().await.unwrap(), 2);
        assert_eq!(pipeline.batch().pending(), 0);
    }
}
