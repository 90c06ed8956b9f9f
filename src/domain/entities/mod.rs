//! Core domain entities.
//!
//! # Entity Types
//!
//! - [`Ad`] - An advertisement with its durable click aggregate
//!
//! Ads are created and retired outside the ingestion pipeline (see the admin
//! CLI); the pipeline only checks that an ad exists and increments its total.
//! Individual clicks are modelled by [`crate::domain::click_event::ClickEvent`].

pub mod ad;

pub use ad::{Ad, NewAd};
