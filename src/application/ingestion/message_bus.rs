//! Click bus decoupling the HTTP ingress from the consumer pool.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::ingestion::click_worker::run_click_worker;
use crate::application::ingestion::error::{ClickError, ProcessOutcome};
use crate::domain::click_event::ClickEvent;
use crate::infrastructure::messaging::{MessageTransport, TransportError};

pub const CLICK_SUBJECT: &str = "ad.clicks";
pub const CLICK_QUEUE_GROUP: &str = "ad-clicks-workers";

/// Upper bound on a transport health probe.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Processes one click end-to-end; invoked by consumer workers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickHandler: Send + Sync {
    async fn process_click(&self, event: ClickEvent) -> Result<ProcessOutcome, ClickError>;
}

/// Publish side and consumer pool of the click bus.
///
/// A bus built with [`MessageBus::direct`] has no transport: every publish
/// fails with [`TransportError::NotConnected`] and no consumers start, so
/// producers always take the synchronous path. A connected bus drops to
/// direct mode if its consumers cannot be started.
pub struct MessageBus {
    transport: RwLock<Option<Arc<dyn MessageTransport>>>,
    subject: String,
    group: String,
    shutdown: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MessageBus {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self::with_transport(Some(transport))
    }

    /// A bus that was never connected.
    pub fn direct() -> Self {
        Self::with_transport(None)
    }

    fn with_transport(transport: Option<Arc<dyn MessageTransport>>) -> Self {
        Self {
            transport: RwLock::new(transport),
            subject: CLICK_SUBJECT.to_string(),
            group: CLICK_QUEUE_GROUP.to_string(),
            shutdown: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    fn transport(&self) -> Option<Arc<dyn MessageTransport>> {
        self.transport.read().clone()
    }

    pub fn is_direct(&self) -> bool {
        self.transport.read().is_none()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.read().as_ref().map_or("none", |t| t.name())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Probes the transport, giving up after [`HEALTH_PROBE_TIMEOUT`].
    pub async fn health_check(&self) -> bool {
        let Some(transport) = self.transport() else {
            return false;
        };

        match tokio::time::timeout(HEALTH_PROBE_TIMEOUT, transport.health_check()).await {
            Ok(healthy) => healthy,
            Err(_) => {
                warn!(
                    transport = transport.name(),
                    timeout_ms = HEALTH_PROBE_TIMEOUT.as_millis() as u64,
                    "Message bus health probe timed out"
                );
                false
            }
        }
    }

    /// Hands the event to the bus. Never blocks on consumers.
    ///
    /// # Errors
    ///
    /// Any error means the event was not queued and the caller must process
    /// it synchronously.
    pub async fn publish(&self, event: &ClickEvent) -> Result<(), TransportError> {
        let Some(transport) = self.transport() else {
            return Err(TransportError::NotConnected);
        };

        let payload =
            serde_json::to_vec(event).map_err(|e| TransportError::Publish(e.to_string()))?;

        transport.publish(&self.subject, payload).await
    }

    /// Starts `worker_count` competing consumers in one queue group.
    ///
    /// Returns the number of workers started; `0` in direct mode.
    ///
    /// # Errors
    ///
    /// Returns the error if a subscription cannot be opened. By then the
    /// workers already started have been stopped and the bus is in direct
    /// mode.
    pub async fn start_consumers(
        &self,
        handler: Arc<dyn ClickHandler>,
        worker_count: usize,
    ) -> Result<usize, TransportError> {
        let Some(transport) = self.transport() else {
            info!("Message bus not connected, clicks are processed directly");
            return Ok(0);
        };

        for worker_id in 0..worker_count {
            let subscription = match transport.subscribe(&self.subject, &self.group).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    warn!(
                        worker = worker_id,
                        transport = transport.name(),
                        error = %e,
                        "Consumer subscription failed, switching to direct processing"
                    );
                    self.shutdown().await;
                    *self.transport.write() = None;
                    return Err(e);
                }
            };

            let handle = tokio::spawn(run_click_worker(
                worker_id,
                subscription,
                handler.clone(),
                self.shutdown.child_token(),
            ));
            self.workers.lock().push(handle);
        }

        info!(
            workers = worker_count,
            subject = %self.subject,
            group = %self.group,
            transport = transport.name(),
            "Click consumers started"
        );

        Ok(worker_count)
    }

    /// Stops all consumer workers and waits for them to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "Click worker terminated abnormally");
            }
        }
    }
}
