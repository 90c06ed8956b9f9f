//! Utility functions used across the application.
//!
//! - [`client_ip`] - Client address resolution from headers or socket
//! - [`time_frame`] - Analytics time-frame parsing

pub mod client_ip;
pub mod time_frame;
