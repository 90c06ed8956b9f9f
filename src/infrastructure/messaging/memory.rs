//! In-process transport with competing-consumer queue groups.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use super::service::{MessageTransport, Subscription, TransportError};

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

struct GroupQueue {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: SharedReceiver,
}

/// Message transport living entirely inside the process.
///
/// Every `(subject, group)` pair owns one queue; all subscriptions of the
/// group pull from it, so each payload reaches exactly one of them. Publishing
/// to a subject nobody subscribed to fails, mirroring a bus with no consumers.
///
/// [`MemoryTransport::close`] simulates a broker outage: publishes fail and
/// subscriptions end.
#[derive(Default)]
pub struct MemoryTransport {
    groups: Mutex<HashMap<String, HashMap<String, GroupQueue>>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders ends every subscription once drained.
        self.groups.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let groups = self.groups.lock();
        let Some(subject_groups) = groups.get(subject).filter(|g| !g.is_empty()) else {
            return Err(TransportError::NoSubscribers(subject.to_string()));
        };

        // Every group receives its own copy; members of a group compete for it.
        for queue in subject_groups.values() {
            queue
                .sender
                .send(payload.clone())
                .map_err(|_| TransportError::Closed)?;
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> Result<Box<dyn Subscription>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut groups = self.groups.lock();
        let queue = groups
            .entry(subject.to_string())
            .or_default()
            .entry(group.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                GroupQueue {
                    sender,
                    receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
                }
            });

        Ok(Box::new(MemorySubscription {
            receiver: queue.receiver.clone(),
        }))
    }

    async fn health_check(&self) -> bool {
        !self.is_closed()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySubscription {
    receiver: SharedReceiver,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        self.receiver.lock().await.recv().await
    }
}
