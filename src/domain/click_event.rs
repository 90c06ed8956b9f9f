//! Click event model shared by the HTTP ingress, the message bus and the batch writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single ad click travelling through the ingestion pipeline.
///
/// The same record is used as the message-bus payload (JSON) and as the row
/// written by the bulk insert, so every field is self-describing on the wire.
///
/// # Wire Format
///
/// ```json
/// {
///   "id": "7f0c1c2e-7b0e-4a57-9d43-3f4f1c6b5a10",
///   "ad_id": "tech-001",
///   "ip": "203.0.113.5",
///   "playback_time": 12,
///   "timestamp": "2024-05-01T12:00:00.250Z"
/// }
/// ```
///
/// Events are immutable once created; [`ClickEvent::with_id`] returns a copy
/// carrying an identity when the producer did not supply one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub ad_id: String,
    pub ip: String,
    /// Seconds of video played before the click.
    #[serde(default)]
    pub playback_time: i32,
    pub timestamp: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates a new click event with a fresh id.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let event = ClickEvent::new("tech-001", "203.0.113.5", 12, Utc::now());
    /// assert!(event.id.is_some());
    /// ```
    pub fn new(
        ad_id: impl Into<String>,
        ip: impl Into<String>,
        playback_time: i32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            ad_id: ad_id.into(),
            ip: ip.into(),
            playback_time,
            timestamp,
        }
    }

    /// Returns the event unchanged if it has an id, otherwise a copy with a generated one.
    pub fn with_id(self) -> Self {
        match self.id {
            Some(_) => self,
            None => Self {
                id: Some(Uuid::new_v4()),
                ..self
            },
        }
    }

    /// Derives the deduplication key for this event.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            ad_id: self.ad_id.clone(),
            ip: self.ip.clone(),
            second: self.timestamp.timestamp(),
        }
    }
}

/// Deduplication key: ad, origin address and the event time truncated to the second.
///
/// Two clicks from the same address on the same ad within one wall-clock
/// second are treated as the same click.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    ad_id: String,
    ip: String,
    second: i64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.ad_id, self.ip, self.second)
    }
}
