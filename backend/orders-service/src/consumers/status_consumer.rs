/// Cross-service consumer (C5, spec §4.5): consumes `users.status-changed`
/// and dispatches user-inactivation events to the C6 reaction handler.
use crate::config::KafkaConfig;
use crate::db::OrderRepository;
use crate::reactions::UserInactivatedReaction;
use event_schema::{UserStatusChangedEvent, TOPIC_USERS_STATUS_CHANGED};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use transactional_outbox::OutboxRepository;

const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

pub struct StatusConsumer<R: OrderRepository, O: OutboxRepository> {
    consumer: StreamConsumer,
    topics: Vec<String>,
    reaction: UserInactivatedReaction<R, O>,
}

impl<R: OrderRepository, O: OutboxRepository> StatusConsumer<R, O> {
    pub fn new(
        kafka: &KafkaConfig,
        reaction: UserInactivatedReaction<R, O>,
    ) -> Result<Self, rdkafka::error::KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &kafka.brokers)
            .set("group.id", &kafka.consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("enable.partition.eof", "false")
            .create()?;

        Ok(Self {
            consumer,
            topics: kafka.subscribed_topics.clone(),
            reaction,
        })
    }

    /// Best-effort topic existence probe and creation, bounded by
    /// `STARTUP_PROBE_TIMEOUT` (spec §4.5 "Startup hardening"). Falls through
    /// to subscribing regardless of outcome; the client recovers once the
    /// topics appear.
    pub async fn ensure_topics_ready(&self, brokers: &str) {
        let admin: Result<AdminClient<DefaultClientContext>, _> =
            ClientConfig::new().set("bootstrap.servers", brokers).create();

        let admin = match admin {
            Ok(admin) => admin,
            Err(e) => {
                warn!(error = %e, "Could not create Kafka admin client for startup probe");
                return;
            }
        };

        let deadline = tokio::time::Instant::now() + STARTUP_PROBE_TIMEOUT;

        loop {
            match self.consumer.fetch_metadata(None, Duration::from_secs(5)) {
                Ok(metadata) => {
                    let existing: std::collections::HashSet<&str> =
                        metadata.topics().iter().map(|t| t.name()).collect();
                    let missing: Vec<&str> = self
                        .topics
                        .iter()
                        .map(|t| t.as_str())
                        .filter(|t| !existing.contains(t))
                        .collect();

                    if missing.is_empty() {
                        info!(topics = ?self.topics, "Subscribed topics are present");
                        return;
                    }

                    info!(missing = ?missing, "Attempting best-effort creation of missing topics");
                    let new_topics: Vec<NewTopic> = missing
                        .iter()
                        .map(|t| NewTopic::new(t, 1, TopicReplication::Fixed(1)))
                        .collect();

                    if let Err(e) = admin
                        .create_topics(&new_topics, &AdminOptions::new())
                        .await
                    {
                        warn!(error = %e, "Topic creation request failed");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Kafka metadata probe failed, retrying");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                warn!("Startup topic probe timed out, subscribing anyway");
                return;
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let topic_refs: Vec<&str> = self.topics.iter().map(|t| t.as_str()).collect();
        if let Err(e) = self.consumer.subscribe(&topic_refs) {
            error!(error = %e, "Failed to subscribe to topics, consumer exiting");
            return;
        }

        info!(topics = ?self.topics, "Status consumer starting");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Status consumer received shutdown signal, exiting");
                    break;
                }
                message = self.consumer.recv() => {
                    match message {
                        Ok(record) => {
                            let owned = record.detach();
                            match self.process(&owned).await {
                                Ok(()) => {
                                    if let Err(e) = self.consumer.commit_message(&owned, CommitMode::Sync) {
                                        error!(error = %e, "Failed to commit Kafka offset");
                                    }
                                }
                                Err(e) => {
                                    error!(error = %e, "Status event handling failed, offset not committed");
                                }
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Kafka consumer error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    async fn process(&self, record: &rdkafka::message::OwnedMessage) -> anyhow::Result<()> {
        let payload = match record.payload() {
            Some(p) => p,
            None => {
                debug!("Skipping empty-payload Kafka message");
                return Ok(());
            }
        };

        if record.topic() != TOPIC_USERS_STATUS_CHANGED {
            debug!(topic = record.topic(), "Ignoring unsubscribed topic");
            return Ok(());
        }

        let event: UserStatusChangedEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Undecodable status-changed payload, skipping poison message");
                return Ok(());
            }
        };

        if event.new_status != "Inactive" {
            debug!(user_id = %event.user_id, new_status = %event.new_status, "Ignoring non-inactivation status change");
            return Ok(());
        }

        let outcome = self.reaction.handle(event.event_id, event.user_id).await?;

        match outcome {
            idempotent_consumer::ProcessingResult::Failed(err) => {
                anyhow::bail!("user inactivation reaction failed: {err}");
            }
            outcome => {
                info!(user_id = %event.user_id, outcome = ?outcome, "Processed user inactivation");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// The outbox publisher (C2) writes the event struct's own JSON as the
    /// record value, with no outer envelope — this must stay in sync with
    /// whatever `UserCommandService::change_user_status` serializes.
    #[test]
    fn decodes_the_flat_payload_the_publisher_actually_writes() {
        let event = UserStatusChangedEvent {
            event_id: Uuid::new_v4(),
            occurred_at: chrono::Utc::now(),
            user_id: Uuid::new_v4(),
            old_status: "Active".to_string(),
            new_status: "Inactive".to_string(),
            reason: Some("admin".to_string()),
        };
        let wire = serde_json::to_vec(&event).unwrap();

        let decoded: UserStatusChangedEvent = serde_json::from_slice(&wire).unwrap();
        assert_eq!(decoded.user_id, event.user_id);
        assert_eq!(decoded.new_status, "Inactive");
    }

    #[test]
    fn envelope_wrapped_payload_is_not_the_wire_format() {
        let event = UserStatusChangedEvent {
            event_id: Uuid::new_v4(),
            occurred_at: chrono::Utc::now(),
            user_id: Uuid::new_v4(),
            old_status: "Active".to_string(),
            new_status: "Inactive".to_string(),
            reason: None,
        };
        let enveloped = event_schema::EventEnvelope::new("users-service", event);
        let wire = serde_json::to_vec(&enveloped).unwrap();

        assert!(serde_json::from_slice::<UserStatusChangedEvent>(&wire).is_err());
    }
}
