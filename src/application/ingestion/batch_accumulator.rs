//! Buffers accepted clicks and writes them to the durable store in bulk.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::ingestion::circuit_breaker::CircuitBreaker;
use crate::application::ingestion::error::ClickError;
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::AdRepository;
use crate::infrastructure::telemetry;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Buffer length that triggers an immediate flush.
    pub flush_threshold: usize,
    /// Hard cap on buffered events while flushes keep failing.
    pub max_buffered: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 100,
            max_buffered: 10_000,
        }
    }
}

/// What happened to an enqueued event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended; no flush was due.
    Buffered { pending: usize },
    /// Appended and the threshold flush wrote the whole buffer.
    Flushed { written: usize },
    /// Appended, but the threshold flush failed or was rejected by the breaker.
    /// The buffer is intact and will be retried.
    FlushDeferred { pending: usize },
    /// The buffer was at its cap, so the event was written on its own.
    WrittenDirectly,
}

/// Ordered buffer of clicks awaiting a bulk write.
///
/// The buffer is cleared only after a successful bulk write and never partially
/// drained. Flushes run while holding the buffer lock, so a slow store delays
/// concurrent enqueues for the duration of the write.
pub struct BatchAccumulator {
    store: Arc<dyn AdRepository>,
    breaker: Arc<CircuitBreaker>,
    config: BatchConfig,
    buffer: Mutex<Vec<ClickEvent>>,
    pending: AtomicUsize,
}

impl BatchAccumulator {
    pub fn new(store: Arc<dyn AdRepository>, breaker: Arc<CircuitBreaker>, config: BatchConfig) -> Self {
        let capacity = config.flush_threshold;
        Self {
            store,
            breaker,
            config,
            buffer: Mutex::new(Vec::with_capacity(capacity)),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Number of buffered events, readable without taking the buffer lock.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Appends `event`, flushing synchronously once the threshold is reached.
    ///
    /// # Errors
    ///
    /// Returns [`ClickError::BufferFull`] when the buffer is at `max_buffered`
    /// and the event could not be written on its own either. A failed threshold
    /// flush is not an error: the event is buffered and the outcome is
    /// [`EnqueueOutcome::FlushDeferred`].
    pub async fn enqueue(&self, event: ClickEvent) -> Result<EnqueueOutcome, ClickError> {
        let mut buffer = self.buffer.lock().await;

        if buffer.len() >= self.config.max_buffered {
            drop(buffer);
            return self.write_overflow(event).await;
        }

        buffer.push(event);
        self.set_pending(buffer.len());

        if buffer.len() < self.config.flush_threshold {
            return Ok(EnqueueOutcome::Buffered {
                pending: buffer.len(),
            });
        }

        match self.flush_locked(&mut buffer).await {
            Ok(written) => Ok(EnqueueOutcome::Flushed { written }),
            Err(e) => {
                warn!(
                    error = %e,
                    pending = buffer.len(),
                    "Threshold flush failed, clicks stay buffered"
                );
                Ok(EnqueueOutcome::FlushDeferred {
                    pending: buffer.len(),
                })
            }
        }
    }

    /// Writes the whole buffer now, regardless of its size.
    ///
    /// Returns the number of events written; `0` if the buffer was empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClickError::CircuitOpen`] or [`ClickError::TransientStoreFailure`]
    /// and leaves the buffer untouched.
    pub async fn flush_now(&self) -> Result<usize, ClickError> {
        let mut buffer = self.buffer.lock().await;
        self.flush_locked(&mut buffer).await
    }

    /// Final flush at shutdown.
    ///
    /// Goes straight to the store even if the circuit is open: this is the
    /// last chance to persist the buffer before the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ClickError::TransientStoreFailure`] and leaves the buffer
    /// untouched if the write fails.
    pub async fn drain(&self) -> Result<usize, ClickError> {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let result = self.store.bulk_insert_clicks(buffer.as_slice()).await;
        telemetry::record_db_operation("bulk_insert_clicks", result.is_ok(), started.elapsed());
        result?;

        let written = buffer.len();
        buffer.clear();
        self.set_pending(0);

        Ok(written)
    }

    async fn flush_locked(&self, buffer: &mut Vec<ClickEvent>) -> Result<usize, ClickError> {
        if buffer.is_empty() {
            return Ok(0);
        }

        let written = buffer.len();
        self.bulk_write(buffer.as_slice()).await?;

        buffer.clear();
        self.set_pending(0);
        debug!(written, "Flushed click batch");

        Ok(written)
    }

    async fn write_overflow(&self, event: ClickEvent) -> Result<EnqueueOutcome, ClickError> {
        let capacity = self.config.max_buffered;

        match self.bulk_write(std::slice::from_ref(&event)).await {
            Ok(()) => {
                info!(ad_id = %event.ad_id, "Click buffer at capacity, wrote click directly");
                Ok(EnqueueOutcome::WrittenDirectly)
            }
            Err(e) => {
                warn!(error = %e, capacity, "Click buffer full and direct write failed");
                telemetry::record_error("buffer_full", "batch_accumulator");
                Err(ClickError::BufferFull { capacity })
            }
        }
    }

    async fn bulk_write(&self, batch: &[ClickEvent]) -> Result<(), ClickError> {
        let store = &self.store;
        let started = Instant::now();

        let result = self
            .breaker
            .call(move || store.bulk_insert_clicks(batch))
            .await
            .map_err(ClickError::from);

        match &result {
            Ok(()) => telemetry::record_db_operation("bulk_insert_clicks", true, started.elapsed()),
            Err(ClickError::CircuitOpen) => {}
            Err(_) => {
                telemetry::record_db_operation("bulk_insert_clicks", false, started.elapsed());
                telemetry::record_error("store_failure", "batch_accumulator");
            }
        }

        result
    }

    fn set_pending(&self, pending: usize) {
        self.pending.store(pending, Ordering::Relaxed);
        telemetry::record_batch_pending(pending);
    }
}
