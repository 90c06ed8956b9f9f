//! Application layer orchestrating domain operations.
//!
//! # Modules
//!
//! - [`ingestion`] - The resilient click-ingestion pipeline
//! - [`services`] - Ad management and analytics for handlers and the CLI

pub mod ingestion;
pub mod services;
