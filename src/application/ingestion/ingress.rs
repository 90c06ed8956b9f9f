//! Producer entry point: publish to the bus, fall back to direct processing.

use std::sync::Arc;
use tracing::warn;

use crate::application::ingestion::coordinator::IngestionCoordinator;
use crate::application::ingestion::error::{ClickError, ProcessOutcome};
use crate::application::ingestion::message_bus::MessageBus;
use crate::domain::click_event::ClickEvent;
use crate::infrastructure::telemetry;

/// How a submitted click was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Published on the bus; a consumer worker will process it.
    Queued,
    /// The bus was unavailable and the click was processed before returning.
    Processed(ProcessOutcome),
}

impl Submission {
    pub fn processing_mode(&self) -> &'static str {
        match self {
            Self::Queued => "asynchronous",
            Self::Processed(_) => "direct",
        }
    }
}

/// Accepts clicks from producers without ever losing one to a bus outage.
pub struct ClickIngress {
    bus: Arc<MessageBus>,
    coordinator: Arc<IngestionCoordinator>,
}

impl ClickIngress {
    pub fn new(bus: Arc<MessageBus>, coordinator: Arc<IngestionCoordinator>) -> Self {
        Self { bus, coordinator }
    }

    /// Publishes the click, or processes it synchronously if publishing fails.
    ///
    /// # Errors
    ///
    /// Transport failures are never returned. Errors come only from the
    /// synchronous path, e.g. [`ClickError::NotFound`].
    pub async fn submit(&self, event: ClickEvent) -> Result<Submission, ClickError> {
        let event = event.with_id();

        match self.bus.publish(&event).await {
            Ok(()) => Ok(Submission::Queued),
            Err(e) => {
                if !self.bus.is_direct() {
                    warn!(
                        ad_id = %event.ad_id,
                        click_id = ?event.id,
                        error = %e,
                        "Publish failed, processing click directly"
                    );
                }
                telemetry::record_fallback();

                let outcome = self.coordinator.process_click(event).await?;
                Ok(Submission::Processed(outcome))
            }
        }
    }
}
