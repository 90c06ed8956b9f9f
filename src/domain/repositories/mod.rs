//! Repository trait definitions for the domain layer.
//!
//! These traits abstract durable storage following the Repository pattern.
//! Implementations live in `crate::infrastructure::persistence`; mocks are
//! generated via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`AdRepository`] - ads, click rows and per-ad totals
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod ad_repository;

pub use ad_repository::{AdRepository, StoreError};

#[cfg(test)]
pub use ad_repository::MockAdRepository;
