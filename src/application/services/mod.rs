//! Read-side and management services used by the HTTP layer and the admin CLI.

pub mod ad_service;
pub mod analytics_service;

pub use ad_service::AdService;
pub use analytics_service::{AdAnalytics, AnalyticsOverview, AnalyticsService, DEFAULT_TIME_FRAME};
