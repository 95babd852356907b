//! # Transactional Outbox Pattern Implementation
//!
//! This library implements the Transactional Outbox pattern used by the
//! users-service and orders-service to guarantee atomicity between a local
//! domain-state change and the event that announces it, without ever calling
//! the bus producer from inside a request handler.
//!
//! ## What is the Transactional Outbox Pattern?
//!
//! 1. A domain write and its corresponding outbox row are inserted in the
//!    same local transaction — both commit or neither does.
//! 2. A background drainer (`OutboxProcessor`) periodically claims a batch of
//!    pending rows under a row-level lock and hands each to a publisher.
//! 3. A row is marked sent only after the publisher confirms durable
//!    delivery; any other outcome increments its retry count and leaves it
//!    eligible for the next drain cycle (or routes it to a dead-letter topic
//!    once retries are exhausted).
//!
//! This guarantees **at-least-once delivery** and survives a crash at any
//! point between the domain commit and the bus publish.
//!
//! ## Usage Example
//!
//! ### 1. Insert data and event in same transaction
//!
//! ```rust,no_run
//! use transactional_outbox::{OutboxRepository, SqlxOutboxRepository};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//! use serde_json::json;
//!
//! async fn create_user(
//!     pool: &PgPool,
//!     outbox_repo: &SqlxOutboxRepository,
//!     user_id: Uuid,
//!     name: &str,
//!     email: &str,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!
//!     sqlx::query("INSERT INTO users (id, name, email, status) VALUES ($1, $2, $3, 'Active')")
//!         .bind(user_id)
//!         .bind(name)
//!         .bind(email)
//!         .execute(&mut *tx)
//!         .await?;
//!
//!     outbox_repo
//!         .append(
//!             &mut tx,
//!             "users.created",
//!             user_id,
//!             &json!({ "id": user_id, "name": name, "email": email }),
//!         )
//!         .await?;
//!
//!     tx.commit().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ### 2. Start the background drainer
//!
//! ```rust,no_run
//! use transactional_outbox::{OutboxProcessor, OutboxProcessorConfig, SqlxOutboxRepository, KafkaOutboxPublisher};
//! use rdkafka::producer::FutureProducer;
//! use rdkafka::ClientConfig;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PgPool::connect("postgresql://localhost/users").await?;
//!
//!     let producer: FutureProducer = ClientConfig::new()
//!         .set("bootstrap.servers", "localhost:9092")
//!         .set("enable.idempotence", "true")
//!         .set("acks", "all")
//!         .create()?;
//!
//!     let repository = Arc::new(SqlxOutboxRepository::new(pool));
//!     let publisher = Arc::new(KafkaOutboxPublisher::new(producer, "dead-letter".to_string()));
//!
//!     let config = OutboxProcessorConfig {
//!         batch_size: 100,
//!         poll_interval: Duration::from_secs(2),
//!         lock_duration: Duration::from_secs(30),
//!         max_retries: 5,
//!     };
//!
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!     let processor = OutboxProcessor::new(repository, publisher, config);
//!     processor.run(shutdown_rx).await;
//!
//!     Ok(())
//! }
//! ```

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_schema::outbox::{DeadLetterEnvelope, OutboxEvent};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

mod error;
pub mod macros;
pub mod metrics;

pub use error::{OutboxError, OutboxResult};

/// A settled row, broadcast to any interested fan-out relay after a drain
/// cycle publishes (or dead-letters) it. Best-effort: a lagged receiver just
/// misses records rather than blocking the drain loop.
#[derive(Debug, Clone)]
pub struct RelayRecord {
    pub topic: String,
    pub raw_payload: String,
}

/// Repository trait for managing outbox rows in the database.
///
/// This trait abstracts database operations to allow for testing and
/// alternative implementations.
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Append a pending row within an active domain transaction.
    ///
    /// The row becomes durable if and only if the enclosing transaction
    /// commits; this method performs no commit of its own.
    async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_type: &str,
        aggregate_id: Uuid,
        payload: &(impl Serialize + Sync),
    ) -> OutboxResult<Uuid>;

    /// Claim up to `limit` pending rows (sent_at null, retry_count <= max_retries)
    /// ordered by creation time, locking each for `lock_duration` so other
    /// drainers skip them until the lock expires.
    async fn acquire_batch(
        &self,
        limit: i64,
        lock_duration: Duration,
        max_retries: i32,
    ) -> OutboxResult<Vec<OutboxEvent>>;

    /// Mark a row as sent. Idempotent against a missing row (already settled
    /// by another drainer) by returning `RowNotFound`.
    async fn mark_sent(&self, id: Uuid) -> OutboxResult<()>;

    /// Increment a row's retry count and record the error. If `permanent` is
    /// set the row's `sent_at` is also stamped so it never drains again (used
    /// when the row has been routed to the dead-letter topic).
    async fn mark_failed(&self, id: Uuid, error: &str, permanent: bool) -> OutboxResult<()>;

    /// Compute pending count and oldest pending age (seconds). Returns age=0 if none pending.
    async fn pending_stats(&self) -> OutboxResult<(i64, i64)>;
}

/// SQLx-based implementation of `OutboxRepository` using PostgreSQL.
pub struct SqlxOutboxRepository {
    pool: PgPool,
}

impl SqlxOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn pending_stats(&self) -> OutboxResult<(i64, i64)> {
        let rec = sqlx::query(
            r#"
            SELECT
                COUNT(*)::BIGINT AS pending,
                COALESCE(EXTRACT(EPOCH FROM (NOW() - MIN(created_at)))::BIGINT, 0) AS age_seconds
            FROM outbox_events
            WHERE sent_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute pending stats")?;

        let pending: i64 = rec.try_get("pending").unwrap_or(0);
        let age: i64 = rec.try_get("age_seconds").unwrap_or(0);
        Ok((pending, age))
    }

    /// Replay rows created since the given timestamp by resetting them to pending.
    pub async fn replay_since(&self, ts: DateTime<Utc>) -> OutboxResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE outbox_events
            SET sent_at = NULL,
                retry_count = 0,
                last_error = NULL,
                locked_until = NULL,
                locked_by = NULL
            WHERE created_at >= $1
            "#,
        )
        .bind(ts)
        .execute(&self.pool)
        .await
        .context("Failed to replay rows since timestamp")?;

        Ok(res.rows_affected())
    }

    /// Replay rows by ID range (inclusive) for operational backfill.
    pub async fn replay_range(&self, from_id: Uuid, to_id: Uuid) -> OutboxResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE outbox_events
            SET sent_at = NULL,
                retry_count = 0,
                last_error = NULL,
                locked_until = NULL,
                locked_by = NULL
            WHERE id BETWEEN $1 AND $2
            "#,
        )
        .bind(from_id)
        .bind(to_id)
        .execute(&self.pool)
        .await
        .context("Failed to replay rows by id range")?;

        Ok(res.rows_affected())
    }

    fn row_to_event(row: sqlx::postgres::PgRow) -> Result<OutboxEvent, sqlx::Error> {
        let payload_value: serde_json::Value = row.try_get("payload")?;
        Ok(OutboxEvent {
            id: row.try_get("id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            event_type: row.try_get("event_type")?,
            payload: payload_value.to_string(),
            created_at: row.try_get("created_at")?,
            sent_at: row.try_get("sent_at")?,
            retry_count: row.try_get::<i32, _>("retry_count")? as u32,
            last_error: row.try_get("last_error")?,
        })
    }
}

#[async_trait]
impl OutboxRepository for SqlxOutboxRepository {
    async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_type: &str,
        aggregate_id: Uuid,
        payload: &(impl Serialize + Sync),
    ) -> OutboxResult<Uuid> {
        let id = Uuid::new_v4();
        let payload_value = serde_json::to_value(payload)?;

        sqlx::query(
            r#"
            INSERT INTO outbox_events (
                id, aggregate_id, event_type, payload, created_at, retry_count
            ) VALUES ($1, $2, $3, $4, NOW(), 0)
            "#,
        )
        .bind(id)
        .bind(aggregate_id)
        .bind(event_type)
        .bind(&payload_value)
        .execute(&mut **tx)
        .await
        .context("Failed to append row to outbox")?;

        debug!(
            outbox_id = %id,
            event_type = %event_type,
            aggregate_id = %aggregate_id,
            "Row appended to outbox"
        );

        Ok(id)
    }

    async fn acquire_batch(
        &self,
        limit: i64,
        lock_duration: Duration,
        max_retries: i32,
    ) -> OutboxResult<Vec<OutboxEvent>> {
        let lock_id = Uuid::new_v4();
        let lock_seconds = lock_duration.as_secs() as f64;

        let rows = sqlx::query(
            r#"
            WITH claimed AS (
                SELECT id
                FROM outbox_events
                WHERE sent_at IS NULL
                  AND retry_count <= $1
                  AND (locked_until IS NULL OR locked_until < NOW())
                ORDER BY created_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE outbox_events o
            SET locked_until = NOW() + make_interval(secs => $3),
                locked_by = $4
            FROM claimed
            WHERE o.id = claimed.id
            RETURNING o.id, o.aggregate_id, o.event_type, o.payload, o.created_at, o.sent_at, o.retry_count, o.last_error
            "#,
        )
        .bind(max_retries)
        .bind(limit)
        .bind(lock_seconds)
        .bind(lock_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to acquire outbox batch")?;

        let events = rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .context("Failed to parse acquired outbox rows")?;

        debug!(count = events.len(), lock_id = %lock_id, "Acquired outbox batch");

        Ok(events)
    }

    async fn mark_sent(&self, id: Uuid) -> OutboxResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET sent_at = NOW(), locked_until = NULL, locked_by = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark outbox row as sent")?;

        if result.rows_affected() == 0 {
            warn!(outbox_id = %id, "Row not found when marking as sent");
            return Err(OutboxError::RowNotFound(id));
        }

        debug!(outbox_id = %id, "Row marked as sent");
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str, permanent: bool) -> OutboxResult<()> {
        let result = if permanent {
            sqlx::query(
                r#"
                UPDATE outbox_events
                SET retry_count = retry_count + 1,
                    last_error = $2,
                    sent_at = NOW(),
                    locked_until = NULL,
                    locked_by = NULL
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE outbox_events
                SET retry_count = retry_count + 1,
                    last_error = $2,
                    locked_until = NULL,
                    locked_by = NULL
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await
        }
        .context("Failed to mark outbox row as failed")?;

        if result.rows_affected() == 0 {
            warn!(outbox_id = %id, "Row not found when marking as failed");
            return Err(OutboxError::RowNotFound(id));
        }

        warn!(outbox_id = %id, error = %error, permanent, "Row marked as failed");
        Ok(())
    }

    async fn pending_stats(&self) -> OutboxResult<(i64, i64)> {
        SqlxOutboxRepository::pending_stats(self).await
    }
}

/// Outcome of a single publish attempt.
#[derive(Debug)]
pub enum PublishOutcome {
    Success,
    TransientFailure(String),
    PermanentFailure(String),
}

/// Publisher trait for delivering an outbox row to the bus.
///
/// Implementations must be idempotent-friendly: a retried publish of the same
/// row is expected (at-least-once delivery), so the producer side should rely
/// on the bus's own idempotent-producer guarantees rather than trying to
/// de-duplicate here.
#[async_trait]
pub trait OutboxPublisher: Send + Sync {
    /// Publish a row. `max_retries` lets the publisher decide whether this
    /// attempt should go to the destination topic or be routed to the
    /// dead-letter topic because retries are already exhausted.
    async fn publish(&self, row: &OutboxEvent, max_retries: i32) -> PublishOutcome;

    /// Block until every in-flight produce request is acknowledged or
    /// `grace` elapses, whichever comes first. Called once by
    /// `OutboxProcessor::run` after the drain loop exits on shutdown.
    /// Publishers with nothing to flush can keep the default no-op.
    async fn flush(&self, _grace: Duration) {}
}

/// Kafka-based implementation of `OutboxPublisher`.
///
/// Requires the producer to be configured with `enable.idempotence = true`
/// and `acks = all` so a successful `send` means durable replication.
pub struct KafkaOutboxPublisher {
    producer: FutureProducer,
    dead_letter_topic: String,
}

impl KafkaOutboxPublisher {
    /// `dead_letter_topic` is the configurable quarantine topic rows are
    /// routed to once `retry_count` reaches `max_retries`.
    pub fn new(producer: FutureProducer, dead_letter_topic: String) -> Self {
        Self {
            producer,
            dead_letter_topic,
        }
    }

    fn headers_for(event_id: &str, event_type: &str, created_at: &str) -> OwnedHeaders {
        OwnedHeaders::new()
            .insert(Header {
                key: "event_id",
                value: Some(event_id.as_bytes()),
            })
            .insert(Header {
                key: "event_type",
                value: Some(event_type.as_bytes()),
            })
            .insert(Header {
                key: "created_at",
                value: Some(created_at.as_bytes()),
            })
    }

    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
        headers: OwnedHeaders,
    ) -> Result<(), String> {
        let record = FutureRecord::to(topic).key(key).payload(payload).headers(headers);

        self.producer
            .send(record, Duration::from_secs(30))
            .await
            .map(|_| ())
            .map_err(|(err, _)| err.to_string())
    }
}

#[async_trait]
impl OutboxPublisher for KafkaOutboxPublisher {
    async fn publish(&self, row: &OutboxEvent, max_retries: i32) -> PublishOutcome {
        let event_id_str = row.id.to_string();
        let created_at_str = row.created_at.to_rfc3339();

        if row.retry_count as i32 >= max_retries {
            let envelope = match DeadLetterEnvelope::for_exhausted(row) {
                Ok(e) => e,
                Err(e) => return PublishOutcome::PermanentFailure(format!("malformed payload: {e}")),
            };
            let payload_str = match serde_json::to_string(&envelope) {
                Ok(s) => s,
                Err(e) => {
                    return PublishOutcome::PermanentFailure(format!(
                        "failed to serialize dead-letter envelope: {e}"
                    ))
                }
            };
            let headers = Self::headers_for(&event_id_str, &row.event_type, &created_at_str);

            return match self
                .send(&self.dead_letter_topic, &row.partition_key(), &payload_str, headers)
                .await
            {
                Ok(()) => {
                    info!(outbox_id = %row.id, event_type = %row.event_type, "Row routed to dead-letter topic");
                    PublishOutcome::PermanentFailure("MaxRetriesExceeded".to_string())
                }
                Err(e) => {
                    error!(outbox_id = %row.id, error = %e, "Failed to publish dead-letter envelope");
                    PublishOutcome::PermanentFailure(format!("dead-letter publish failed: {e}"))
                }
            };
        }

        let topic = row.kafka_topic();
        let headers = Self::headers_for(&event_id_str, &row.event_type, &created_at_str);

        match self.send(topic, &row.partition_key(), &row.payload, headers).await {
            Ok(()) => {
                info!(outbox_id = %row.id, event_type = %row.event_type, topic = %topic, "Row published");
                PublishOutcome::Success
            }
            Err(e) => {
                warn!(outbox_id = %row.id, event_type = %row.event_type, error = %e, "Publish failed, will retry");
                PublishOutcome::TransientFailure(e)
            }
        }
    }

    /// `FutureProducer::flush` blocks the calling thread until librdkafka's
    /// internal queue drains or the timeout elapses, so it runs on a
    /// blocking-pool thread rather than the async executor.
    async fn flush(&self, grace: Duration) {
        let producer = self.producer.clone();
        let result = tokio::task::spawn_blocking(move || producer.flush(grace)).await;

        match result {
            Ok(Ok(())) => info!("Kafka producer flushed cleanly on shutdown"),
            Ok(Err(e)) => warn!(error = %e, "Kafka producer flush did not complete within grace period"),
            Err(e) => error!(error = %e, "Kafka producer flush task panicked"),
        }
    }
}

/// Bound on how long `OutboxProcessor::run` waits for the bus producer to
/// flush in-flight acknowledgements on shutdown (spec §5).
const SHUTDOWN_FLUSH_GRACE: Duration = Duration::from_secs(5);

/// Configuration for `OutboxProcessor`.
#[derive(Debug, Clone)]
pub struct OutboxProcessorConfig {
    pub batch_size: i64,
    pub poll_interval: Duration,
    pub lock_duration: Duration,
    pub max_retries: i32,
}

impl Default for OutboxProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_secs(2),
            lock_duration: Duration::from_secs(30),
            max_retries: 5,
        }
    }
}

/// Background drainer: `Idle -> Acquiring -> Publishing -> Settling -> Idle`.
///
/// Runs as a single long-lived task per service instance. A bad row never
/// aborts the cycle; it is marked failed and processing continues with the
/// next row. Backoff for a row under retry comes from its lock expiring and
/// reappearing in a later `acquire_batch`, not from an in-loop sleep.
pub struct OutboxProcessor<R: OutboxRepository, P: OutboxPublisher> {
    repository: Arc<R>,
    publisher: Arc<P>,
    config: OutboxProcessorConfig,
    metrics: Option<crate::metrics::OutboxMetrics>,
    relay: Option<broadcast::Sender<RelayRecord>>,
}

impl<R: OutboxRepository, P: OutboxPublisher> OutboxProcessor<R, P> {
    pub fn new(repository: Arc<R>, publisher: Arc<P>, config: OutboxProcessorConfig) -> Self {
        Self {
            repository,
            publisher,
            config,
            metrics: None,
            relay: None,
        }
    }

    pub fn with_metrics(mut self, metrics: crate::metrics::OutboxMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Feed every settled row onto a broadcast channel for a fan-out relay to
    /// pick up. Best-effort: a lagged receiver just misses records.
    pub fn with_relay(mut self, relay: broadcast::Sender<RelayRecord>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Run the drain loop until `shutdown` fires. A cycle already in flight
    /// is never cancelled mid-publish: `shutdown` is only raced against the
    /// poll-interval sleep between cycles, never against `drain_cycle`
    /// itself. Once the loop exits, the bus producer is given a bounded
    /// grace period to flush any acknowledgements still in flight.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_retries = self.config.max_retries,
            "Outbox drainer starting"
        );

        loop {
            let result = self.drain_cycle().await;
            match result {
                Ok(0) => debug!("No pending outbox rows"),
                Ok(n) => info!(settled = n, "Outbox drain cycle completed"),
                Err(e) => error!(error = ?e, "Outbox drain cycle failed"),
            }

            if let Some(metrics) = &self.metrics {
                if let Ok((pending, age)) = self.repository.pending_stats().await {
                    metrics.pending.set(pending);
                    metrics.oldest_pending_age_seconds.set(age);
                }
            }

            // A signal that arrived mid-cycle is already sitting in the
            // channel; don't block on `recv` only to race it against the
            // sleep below.
            if matches!(
                shutdown.try_recv(),
                Ok(_) | Err(broadcast::error::TryRecvError::Closed)
            ) {
                info!("Outbox drainer received shutdown signal, exiting after completed cycle");
                break;
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Outbox drainer received shutdown signal, exiting");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.publisher.flush(SHUTDOWN_FLUSH_GRACE).await;
    }

    /// One `Acquiring -> Publishing -> Settling` cycle. Returns the number of
    /// rows settled (sent or dead-lettered), not counting rows left pending
    /// after a transient retry.
    async fn drain_cycle(&self) -> OutboxResult<usize> {
        let rows = self
            .repository
            .acquire_batch(
                self.config.batch_size,
                self.config.lock_duration,
                self.config.max_retries,
            )
            .await?;

        let mut settled = 0;

        for row in rows {
            let outcome = self.publisher.publish(&row, self.config.max_retries).await;
            self.settle(&row, outcome, &mut settled).await;
        }

        Ok(settled)
    }

    async fn settle(&self, row: &OutboxEvent, outcome: PublishOutcome, settled: &mut usize) {
        match outcome {
            PublishOutcome::Success => {
                if let Err(e) = self.repository.mark_sent(row.id).await {
                    error!(outbox_id = %row.id, error = ?e, "Failed to mark row as sent after successful publish");
                } else {
                    *settled += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.sent.inc();
                    }
                    self.relay_record(row);
                }
            }
            PublishOutcome::TransientFailure(err) => {
                if let Err(e) = self.repository.mark_failed(row.id, &err, false).await {
                    error!(outbox_id = %row.id, error = ?e, "Failed to mark row as transiently failed");
                } else if let Some(metrics) = &self.metrics {
                    metrics.retried.inc();
                }
            }
            PublishOutcome::PermanentFailure(err) => {
                if let Err(e) = self.repository.mark_failed(row.id, &err, true).await {
                    error!(outbox_id = %row.id, error = ?e, "Failed to mark row as permanently failed");
                } else {
                    *settled += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.dead_lettered.inc();
                    }
                    self.relay_record(row);
                }
            }
        }
    }

    fn relay_record(&self, row: &OutboxEvent) {
        if let Some(relay) = &self.relay {
            let _ = relay.send(RelayRecord {
                topic: row.event_type.clone(),
                raw_payload: row.payload.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubPublisher {
        outcomes: Mutex<Vec<PublishOutcome>>,
    }

    #[async_trait]
    impl OutboxPublisher for StubPublisher {
        async fn publish(&self, _row: &OutboxEvent, _max_retries: i32) -> PublishOutcome {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                PublishOutcome::Success
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn sample_row(event_type: &str) -> OutboxEvent {
        OutboxEvent::new(Uuid::new_v4(), event_type, &json!({"a": 1})).unwrap()
    }

    #[test]
    fn dead_letter_threshold_is_inclusive() {
        let mut row = sample_row("users.created");
        row.retry_count = 3;
        assert!(row.retry_count as i32 >= 3);
    }

    #[tokio::test]
    async fn stub_publisher_returns_queued_outcomes_in_order() {
        let publisher = StubPublisher {
            outcomes: Mutex::new(vec![
                PublishOutcome::TransientFailure("boom".into()),
                PublishOutcome::Success,
            ]),
        };
        let row = sample_row("orders.created");

        match publisher.publish(&row, 5).await {
            PublishOutcome::TransientFailure(msg) => assert_eq!(msg, "boom"),
            other => panic!("expected transient failure, got {other:?}"),
        }
        match publisher.publish(&row, 5).await {
            PublishOutcome::Success => {}
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = OutboxProcessorConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_retries, 5);
    }
}
