//! Resilient click ingestion.
//!
//! # Components
//!
//! - [`CircuitBreaker`] - failure isolation around durable-store writes
//! - [`Deduplicator`] - at-most-once acceptance per click fingerprint
//! - [`CounterCache`] - in-memory per-ad counters for hot reads
//! - [`BatchAccumulator`] - bulk writes gated by the breaker
//! - [`MessageBus`] - publish side and consumer pool of the click bus
//! - [`IngestionCoordinator`] - per-click orchestration
//! - [`ClickIngress`] - publish with synchronous fallback
//! - [`Pipeline`] - wiring, background tasks and shutdown
//!
//! # Click Flow
//!
//! 1. HTTP handler calls [`ClickIngress::submit`]
//! 2. The click is published on the bus, or processed directly if that fails
//! 3. A consumer worker calls [`IngestionCoordinator::process_click`]
//! 4. The click is buffered and counted; the periodic flusher (or the
//!    threshold) writes the buffer in one bulk insert

pub mod batch_accumulator;
pub mod circuit_breaker;
pub mod click_worker;
pub mod coordinator;
pub mod counter_cache;
pub mod deduplicator;
pub mod error;
pub mod ingress;
pub mod message_bus;
pub mod pipeline;

pub use batch_accumulator::{BatchAccumulator, BatchConfig, EnqueueOutcome};
pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use coordinator::IngestionCoordinator;
pub use counter_cache::{CounterCache, CounterEntry};
pub use deduplicator::Deduplicator;
pub use error::{ClickError, ProcessOutcome};
pub use ingress::{ClickIngress, Submission};
pub use message_bus::{
    CLICK_QUEUE_GROUP, CLICK_SUBJECT, ClickHandler, HEALTH_PROBE_TIMEOUT, MessageBus,
};
pub use pipeline::{Pipeline, PipelineConfig};
