//! Error taxonomy of the ingestion pipeline.

use crate::application::ingestion::circuit_breaker::BreakerError;
use crate::domain::repositories::StoreError;
use crate::infrastructure::messaging::TransportError;

/// Result of processing one click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The click was new and has been buffered and counted.
    Accepted,
    /// The click's fingerprint was already accepted; nothing changed.
    Duplicate,
}

/// Failures surfaced by the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ClickError {
    /// The referenced ad does not exist. Not retried.
    #[error("ad not found: {0}")]
    NotFound(String),

    /// The durable store is presumed unhealthy; no write was attempted.
    #[error("durable store circuit is open")]
    CircuitOpen,

    /// The durable store failed; buffered events are retried on the next flush.
    #[error("transient store failure: {0}")]
    TransientStoreFailure(#[from] StoreError),

    /// The message bus could not take the event; callers fall back to direct processing.
    #[error("message transport unavailable: {0}")]
    TransportUnavailable(#[from] TransportError),

    /// The buffer is at capacity and the overflow write failed.
    #[error("click buffer is full ({capacity} events pending)")]
    BufferFull { capacity: usize },

    /// A bus payload could not be decoded into a click event.
    #[error("undecodable click payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClickError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::CircuitOpen => "circuit_open",
            Self::TransientStoreFailure(_) => "store_failure",
            Self::TransportUnavailable(_) => "transport_unavailable",
            Self::BufferFull { .. } => "buffer_full",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<BreakerError<StoreError>> for ClickError {
    fn from(err: BreakerError<StoreError>) -> Self {
        match err {
            BreakerError::Open => Self::CircuitOpen,
            BreakerError::Inner(e) => Self::TransientStoreFailure(e),
        }
    }
}
