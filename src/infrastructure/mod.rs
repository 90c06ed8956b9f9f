//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain and application
//! layers, providing concrete storage, transport and metrics backends.
//!
//! # Modules
//!
//! - [`messaging`] - Click bus transports (Redis Streams and in-process)
//! - [`persistence`] - Ad repository implementations
//! - [`telemetry`] - Metrics sink and Prometheus recorder

pub mod messaging;
pub mod persistence;
pub mod telemetry;
