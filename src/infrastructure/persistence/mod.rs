//! Ad repository implementations.
//!
//! # Repositories
//!
//! - [`PgAdRepository`] - PostgreSQL storage via SQLx
//! - [`MemoryAdRepository`] - in-process storage with the same contract

pub mod memory_ad_repository;
pub mod pg_ad_repository;

pub use memory_ad_repository::MemoryAdRepository;
pub use pg_ad_repository::PgAdRepository;
