//! Consumer worker loop draining one queue-group subscription.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::ingestion::error::{ClickError, ProcessOutcome};
use crate::application::ingestion::message_bus::ClickHandler;
use crate::domain::click_event::ClickEvent;
use crate::infrastructure::messaging::Subscription;
use crate::infrastructure::telemetry;

/// Consumes click payloads from one queue-group subscription until shutdown.
///
/// Undecodable payloads and processing failures are logged and dropped;
/// nothing is redelivered.
pub async fn run_click_worker(
    worker_id: usize,
    mut subscription: Box<dyn Subscription>,
    handler: Arc<dyn ClickHandler>,
    shutdown: CancellationToken,
) {
    info!(worker = worker_id, "Click worker started");

    loop {
        let payload = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            message = subscription.next_message() => match message {
                Some(payload) => payload,
                None => {
                    warn!(worker = worker_id, "Subscription closed");
                    break;
                }
            },
        };

        match handle_payload(&payload, handler.as_ref()).await {
            Ok(ProcessOutcome::Accepted) => {}
            Ok(ProcessOutcome::Duplicate) => {
                debug!(worker = worker_id, "Duplicate click delivered by bus");
            }
            Err(e) => {
                error!(
                    worker = worker_id,
                    error = %e,
                    kind = e.kind(),
                    "Dropping click that failed processing"
                );
                telemetry::record_error(e.kind(), "click_worker");
            }
        }
    }

    info!(worker = worker_id, "Click worker stopped");
}

async fn handle_payload(
    payload: &[u8],
    handler: &dyn ClickHandler,
) -> Result<ProcessOutcome, ClickError> {
    let event: ClickEvent = serde_json::from_slice(payload)?;
    handler.process_click(event).await
}
