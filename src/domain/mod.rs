//! Domain layer containing business entities and storage contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Ads as stored durably
//! - [`click_event`] - Click event model and its dedup fingerprint
//! - [`clock`] - Substitutable time source
//! - [`repositories`] - Data access trait definitions
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Orchestration lives in [`crate::application::ingestion`]

pub mod click_event;
pub mod clock;
pub mod entities;
pub mod repositories;
