#![allow(dead_code)]

use ad_click_tracker::application::ingestion::{Pipeline, PipelineConfig};
use ad_click_tracker::domain::click_event::ClickEvent;
use ad_click_tracker::domain::clock::{Clock, SystemClock};
use ad_click_tracker::domain::entities::{Ad, NewAd};
use ad_click_tracker::domain::repositories::{AdRepository, StoreError};
use ad_click_tracker::infrastructure::messaging::MessageTransport;
use ad_click_tracker::infrastructure::persistence::MemoryAdRepository;
use ad_click_tracker::state::AppState;
use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::{DateTime, TimeZone, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tower::Layer;

pub const PEER_ADDR: &str = "127.0.0.1:12345";

/// Fixed instant used by scenario tests.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn click(ad_id: &str, ip: &str, at: DateTime<Utc>) -> ClickEvent {
    ClickEvent::new(ad_id, ip, 0, at)
}

/// In-memory store whose bulk inserts can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryAdRepository,
    failing: AtomicBool,
    stalled: AtomicBool,
    bulk_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn with_ads(ids: &[&str]) -> Self {
        Self {
            inner: MemoryAdRepository::with_ads(ids.iter().copied()),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes `health_check` hang until the caller gives up.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdRepository for FlakyStore {
    async fn exists_ad(&self, ad_id: &str) -> Result<bool, StoreError> {
        self.inner.exists_ad(ad_id).await
    }

    async fn bulk_insert_clicks(&self, clicks: &[ClickEvent]) -> Result<(), StoreError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        self.inner.bulk_insert_clicks(clicks).await
    }

    async fn increment_ad_total(&self, ad_id: &str, delta: i64) -> Result<(), StoreError> {
        self.inner.increment_ad_total(ad_id, delta).await
    }

    async fn get_ad_total(&self, ad_id: &str) -> Result<i64, StoreError> {
        self.inner.get_ad_total(ad_id).await
    }

    async fn count_clicks_in_window(
        &self,
        ad_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.inner.count_clicks_in_window(ad_id, start, end).await
    }

    async fn list_ads(&self) -> Result<Vec<Ad>, StoreError> {
        self.inner.list_ads().await
    }

    async fn create_ad(&self, new_ad: NewAd) -> Result<Ad, StoreError> {
        self.inner.create_ad(new_ad).await
    }

    async fn health_check(&self) -> bool {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        !self.failing.load(Ordering::SeqCst)
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        workers: 3,
        ..PipelineConfig::default()
    }
}

/// Builds an application state around a started pipeline.
pub async fn create_test_state(
    store: Arc<dyn AdRepository>,
    transport: Option<Arc<dyn MessageTransport>>,
) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pipeline = Arc::new(Pipeline::new(
        pipeline_config(),
        store.clone(),
        transport,
        clock.clone(),
    ));
    pipeline.start().await;

    AppState::new(pipeline, store, clock, None, false)
}

/// Polls `condition` every 10ms for up to two seconds.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Inserts a fixed `ConnectInfo` so handlers and the rate limiter see a peer.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = PEER_ADDR.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
