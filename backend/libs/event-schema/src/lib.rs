use chrono::{DateTime, Utc};
/// Event schema registry for the users/orders event-delivery pipeline.
///
/// Defines the versioned event payloads exchanged between users-service and
/// orders-service over the outbox, plus the envelope and outbox row shapes
/// shared by both.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod outbox;

pub use outbox::{KafkaMessage, OutboxEvent};

/// Current schema version for all events.
pub const SCHEMA_VERSION: u32 = 1;

/// Base event envelope for all bus messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event ID, distinct from the outbox row ID, used for idempotency.
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub schema_version: u32,
    pub source: String,
    pub correlation_id: Option<Uuid>,
    pub data: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(source: impl Into<String>, data: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            schema_version: SCHEMA_VERSION,
            source: source.into(),
            correlation_id: None,
            data,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

// ============================================================================
// USERS SERVICE EVENTS
// ============================================================================

pub const TOPIC_USERS_CREATED: &str = "users.created";
pub const TOPIC_USERS_STATUS_CHANGED: &str = "users.status-changed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedEvent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatusChangedEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// ORDERS SERVICE EVENTS
// ============================================================================

pub const TOPIC_ORDERS_CREATED: &str = "orders.created";
pub const TOPIC_ORDERS_STATUS_CHANGED: &str = "orders.status-changed";
pub const TOPIC_ORDERS_CANCELLED: &str = "orders.cancelled";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product: String,
    pub quantity: i32,
    pub price: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order_id: Uuid,
    pub user_id: Uuid,
    /// One of "user_inactivated", "user_inactive", "timeout", or free-form.
    pub reason: String,
}

pub fn is_compatible(current_version: u32, message_version: u32) -> bool {
    current_version == message_version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_envelope_stamps_current_schema_version() {
        let event = UserCreatedEvent {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            name: "Test User".to_string(),
        };

        let envelope = EventEnvelope::new("users-service", event);
        assert_eq!(envelope.schema_version, SCHEMA_VERSION);
        assert_eq!(envelope.source, "users-service");
        assert!(envelope.correlation_id.is_none());
    }

    #[test]
    fn version_compatibility_is_exact_match_only() {
        assert!(is_compatible(SCHEMA_VERSION, SCHEMA_VERSION));
        assert!(!is_compatible(1, 2));
    }

    #[test]
    fn status_changed_event_omits_reason_when_absent() {
        let event = UserStatusChangedEvent {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            user_id: Uuid::new_v4(),
            old_status: "Active".to_string(),
            new_status: "Inactive".to_string(),
            reason: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("reason"));
    }
}
