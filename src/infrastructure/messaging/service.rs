//! Message transport trait and error types.

use async_trait::async_trait;

/// Errors raised by a message transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport connection error: {0}")]
    Connection(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("transport is closed")]
    Closed,

    #[error("message bus is not connected")]
    NotConnected,

    #[error("no consumers subscribed to '{0}'")]
    NoSubscribers(String),
}

/// Publish/subscribe transport carrying opaque payloads on named subjects.
///
/// Subscribers sharing a queue group compete for messages: each published
/// payload is delivered to exactly one subscription of the group.
///
/// # Implementations
///
/// - [`crate::infrastructure::messaging::RedisStreamTransport`] - Redis Streams consumer groups
/// - [`crate::infrastructure::messaging::MemoryTransport`] - in-process queues
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Hands `payload` to the transport for asynchronous delivery.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Joins `group` on `subject` and returns a new competing subscription.
    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> Result<Box<dyn Subscription>, TransportError>;

    /// Checks if the transport backend is reachable.
    async fn health_check(&self) -> bool;

    /// Backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// One member of a queue group.
#[async_trait]
pub trait Subscription: Send {
    /// Waits for the next payload. `None` means the subscription is closed.
    async fn next_message(&mut self) -> Option<Vec<u8>>;
}
