//! Shared state injected into every handler.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::application::ingestion::Pipeline;
use crate::application::services::{AdService, AnalyticsService};
use crate::domain::clock::Clock;
use crate::domain::repositories::AdRepository;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub ad_service: Arc<AdService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub store: Arc<dyn AdRepository>,
    pub clock: Arc<dyn Clock>,
    /// Renders `/metrics`; `None` when no recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Trust `X-Forwarded-For` / `X-Real-IP` when resolving click origins.
    pub behind_proxy: bool,
}

impl AppState {
    /// Builds the services around an already constructed pipeline.
    pub fn new(
        pipeline: Arc<Pipeline>,
        store: Arc<dyn AdRepository>,
        clock: Arc<dyn Clock>,
        metrics: Option<PrometheusHandle>,
        behind_proxy: bool,
    ) -> Self {
        let ad_service = Arc::new(AdService::new(store.clone()));
        let analytics_service = Arc::new(AnalyticsService::new(
            store.clone(),
            pipeline.counters().clone(),
            clock.clone(),
        ));

        Self {
            pipeline,
            ad_service,
            analytics_service,
            store,
            clock,
            metrics,
            behind_proxy,
        }
    }
}
