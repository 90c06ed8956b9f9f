//! Message transports for the click bus.
//!
//! Provides a [`MessageTransport`] trait with two implementations:
//! - [`RedisStreamTransport`] - Redis Streams with consumer groups
//! - [`MemoryTransport`] - in-process queues for tests and single-node runs

mod memory;
mod redis_streams;
mod service;

pub use memory::MemoryTransport;
pub use redis_streams::RedisStreamTransport;
pub use service::{MessageTransport, Subscription, TransportError};
