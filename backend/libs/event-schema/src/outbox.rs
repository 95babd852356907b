use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbox row stored in the database for reliable event publishing.
///
/// Implements the transactional outbox pattern: atomicity between a domain
/// write and the event record that describes it comes from writing both rows
/// in the same local transaction, never from cross-service coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    /// The domain row (User or Order) whose change produced this event.
    pub aggregate_id: Uuid,
    /// Doubles as the destination bus topic (see `kafka_topic`).
    pub event_type: String,
    /// Serialized event payload (JSON).
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl OutboxEvent {
    pub fn new(
        aggregate_id: Uuid,
        event_type: impl Into<String>,
        payload: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            aggregate_id,
            event_type: event_type.into(),
            payload: serde_json::to_string(&payload)?,
            created_at: Utc::now(),
            sent_at: None,
            retry_count: 0,
            last_error: None,
        })
    }

    /// The destination bus topic. The event type label *is* the topic name;
    /// there is no derivation from naming convention.
    pub fn kafka_topic(&self) -> &str {
        &self.event_type
    }

    /// Partition key for the bus producer. Using the aggregate id keeps every
    /// event for the same User/Order on one partition, preserving per-aggregate
    /// order.
    pub fn partition_key(&self) -> String {
        self.aggregate_id.to_string()
    }

    pub fn to_kafka_message(&self) -> KafkaMessage {
        let headers = vec![
            ("event_id".to_string(), self.id.to_string()),
            ("event_type".to_string(), self.event_type.clone()),
            ("created_at".to_string(), self.created_at.to_rfc3339()),
        ];

        KafkaMessage {
            key: self.partition_key(),
            value: self.payload.clone(),
            headers,
        }
    }

    pub fn mark_sent(&mut self) {
        self.sent_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.retry_count += 1;
        self.last_error = Some(error.into());
    }

    pub fn is_eligible(&self, max_retries: u32) -> bool {
        self.sent_at.is_none() && self.retry_count < max_retries
    }
}

/// A message ready to be handed to the bus producer.
#[derive(Debug, Clone)]
pub struct KafkaMessage {
    pub key: String,
    pub value: String,
    pub headers: Vec<(String, String)>,
}

/// Dead-letter envelope wrapping a payload that exhausted its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEnvelope {
    pub id: Uuid,
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub payload: serde_json::Value,
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
    #[serde(rename = "occurredAt")]
    pub occurred_at: DateTime<Utc>,
    pub reason: String,
}

impl DeadLetterEnvelope {
    pub fn for_exhausted(row: &OutboxEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: row.id,
            event_type: row.event_type.clone(),
            payload: serde_json::from_str(&row.payload)?,
            retry_count: row.retry_count,
            occurred_at: row.created_at,
            reason: "MaxRetriesExceeded".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outbox_event_starts_unsent_with_no_retries() {
        let aggregate_id = Uuid::new_v4();
        let payload = json!({"id": aggregate_id, "name": "Alice", "email": "alice@example.com"});

        let event = OutboxEvent::new(aggregate_id, "users.created", &payload).unwrap();

        assert_eq!(event.aggregate_id, aggregate_id);
        assert_eq!(event.event_type, "users.created");
        assert_eq!(event.retry_count, 0);
        assert!(event.sent_at.is_none());
        assert!(event.last_error.is_none());
    }

    #[test]
    fn topic_is_the_event_type_literally() {
        let event = OutboxEvent::new(Uuid::new_v4(), "orders.cancelled", &json!({})).unwrap();
        assert_eq!(event.kafka_topic(), "orders.cancelled");
    }

    #[test]
    fn partition_key_is_the_aggregate_id() {
        let aggregate_id = Uuid::new_v4();
        let event = OutboxEvent::new(aggregate_id, "orders.created", &json!({})).unwrap();
        assert_eq!(event.partition_key(), aggregate_id.to_string());
    }

    #[test]
    fn mark_sent_and_mark_failed_update_row_state() {
        let mut event = OutboxEvent::new(Uuid::new_v4(), "users.created", &json!({})).unwrap();

        assert!(event.is_eligible(3));
        event.mark_failed("broker unreachable");
        assert_eq!(event.retry_count, 1);
        assert_eq!(event.last_error.as_deref(), Some("broker unreachable"));
        assert!(event.is_eligible(3));

        event.mark_sent();
        assert!(event.sent_at.is_some());
        assert!(!event.is_eligible(3));
    }

    #[test]
    fn dead_letter_envelope_carries_original_payload_and_reason() {
        let mut event =
            OutboxEvent::new(Uuid::new_v4(), "orders.cancelled", &json!({"orderId": "abc"}))
                .unwrap();
        event.retry_count = 2;

        let envelope = DeadLetterEnvelope::for_exhausted(&event).unwrap();
        assert_eq!(envelope.reason, "MaxRetriesExceeded");
        assert_eq!(envelope.retry_count, 2);
        assert_eq!(envelope.payload["orderId"], "abc");

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"eventType\""));
        assert!(json.contains("\"retryCount\""));
        assert!(json.contains("\"occurredAt\""));
    }
}
