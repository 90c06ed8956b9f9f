//! Redis Streams transport.
//!
//! Subjects map to streams and queue groups to consumer groups, so workers
//! sharing a group compete for entries. Entries are acknowledged as soon as
//! they are read (at-most-once); consumer-side failures are not redelivered.

use async_trait::async_trait;
use redis::streams::{StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, aio::ConnectionManager, aio::MultiplexedConnection};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::service::{MessageTransport, Subscription, TransportError};

const PAYLOAD_FIELD: &str = "payload";
const STREAM_MAX_LEN: usize = 100_000;
const READ_COUNT: usize = 32;
const READ_BLOCK_MS: usize = 200;
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Message transport backed by Redis Streams consumer groups.
///
/// Publishing goes through a shared `ConnectionManager`. Each subscription
/// opens its own connection because `XREADGROUP ... BLOCK` would otherwise
/// stall every other command multiplexed on it.
pub struct RedisStreamTransport {
    client: Client,
    publisher: ConnectionManager,
}

impl RedisStreamTransport {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] if the URL is invalid, the
    /// connection cannot be established, or the PING fails.
    pub async fn connect(redis_url: &str) -> Result<Self, TransportError> {
        let client = Client::open(redis_url).map_err(|e| {
            TransportError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let publisher = ConnectionManager::new(client.clone()).await.map_err(|e| {
            TransportError::Connection(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = publisher.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| TransportError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis Streams message bus");

        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl MessageTransport for RedisStreamTransport {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut conn = self.publisher.clone();

        let _id: String = conn
            .xadd_maxlen(
                subject,
                StreamMaxlen::Approx(STREAM_MAX_LEN),
                "*",
                &[(PAYLOAD_FIELD, payload)],
            )
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
    ) -> Result<Box<dyn Subscription>, TransportError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        let created: redis::RedisResult<()> =
            conn.xgroup_create_mkstream(subject, group, "$").await;

        match created {
            Ok(()) => debug!(subject, group, "Created consumer group"),
            Err(e) if e.code() == Some("BUSYGROUP") => {}
            Err(e) => return Err(TransportError::Subscribe(e.to_string())),
        }

        Ok(Box::new(RedisStreamSubscription {
            conn,
            stream: subject.to_string(),
            group: group.to_string(),
            consumer: format!("{}-{}", group, Uuid::new_v4()),
            pending: VecDeque::new(),
        }))
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.publisher.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn name(&self) -> &'static str {
        "redis-streams"
    }
}

struct RedisStreamSubscription {
    conn: MultiplexedConnection,
    stream: String,
    group: String,
    consumer: String,
    pending: VecDeque<Vec<u8>>,
}

impl RedisStreamSubscription {
    async fn read_batch(&mut self) -> redis::RedisResult<()> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(READ_COUNT)
            .block(READ_BLOCK_MS);

        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.stream], &[">"], &options)
            .await?;

        let Some(reply) = reply else {
            return Ok(());
        };

        for key in reply.keys {
            let ids: Vec<String> = key.ids.iter().map(|entry| entry.id.clone()).collect();

            for entry in key.ids {
                match entry.get::<Vec<u8>>(PAYLOAD_FIELD) {
                    Some(payload) => self.pending.push_back(payload),
                    None => warn!(stream = %self.stream, id = %entry.id, "Stream entry without payload"),
                }
            }

            if !ids.is_empty() {
                let _: i64 = self.conn.xack(&self.stream, &self.group, &ids).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Subscription for RedisStreamSubscription {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Some(payload);
            }

            if let Err(e) = self.read_batch().await {
                warn!(
                    stream = %self.stream,
                    consumer = %self.consumer,
                    error = %e,
                    "Stream read failed, backing off"
                );
                tokio::time::sleep(READ_ERROR_BACKOFF).await;
            }
        }
    }
}
