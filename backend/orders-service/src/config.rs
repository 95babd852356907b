/// Configuration management for Orders Service
///
/// Loads typed configuration from environment variables, one struct per
/// concern, mirroring users-service and the rest of this workspace.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub outbox: OutboxConfig,
    pub peer: PeerConfig,
    pub expiry: ExpiryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    pub consumer_group: String,
    pub subscribed_topics: Vec<String>,
    pub dead_letter_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
    pub lock_duration_secs: u64,
    pub max_retries: i32,
}

/// Configuration for the synchronous Create-Order peer probe to the Users
/// service (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub users_service_base_url: String,
}

/// Configuration for the periodic Expiry Scanner (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryConfig {
    pub poll_interval_secs: u64,
    pub batch_size: i64,
    pub order_expiry_default_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("ORDERS_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("ORDERS_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8083),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/orders".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(12),
            },
            kafka: KafkaConfig {
                brokers: std::env::var("KAFKA_BROKERS")
                    .unwrap_or_else(|_| "localhost:9092".to_string()),
                consumer_group: std::env::var("KAFKA_CONSUMER_GROUP")
                    .unwrap_or_else(|_| "orders-service".to_string()),
                subscribed_topics: std::env::var("KAFKA_SUBSCRIBED_TOPICS")
                    .unwrap_or_else(|_| "users.status-changed".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                dead_letter_topic: std::env::var("DEAD_LETTER_TOPIC")
                    .unwrap_or_else(|_| "dead-letter".to_string()),
            },
            outbox: OutboxConfig {
                poll_interval_ms: std::env::var("OUTBOX_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2_000),
                batch_size: std::env::var("OUTBOX_BATCH_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100),
                lock_duration_secs: std::env::var("OUTBOX_LOCK_DURATION_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
                max_retries: std::env::var("OUTBOX_MAX_RETRIES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            },
            peer: PeerConfig {
                users_service_base_url: std::env::var("USERS_SERVICE_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8082".to_string()),
            },
            expiry: ExpiryConfig {
                poll_interval_secs: std::env::var("EXPIRY_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
                batch_size: std::env::var("EXPIRY_BATCH_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
                order_expiry_default_minutes: std::env::var("ORDER_EXPIRY_DEFAULT_MINUTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(15),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_env_overrides() {
        std::env::remove_var("ORDERS_SERVICE_PORT");
        std::env::remove_var("KAFKA_SUBSCRIBED_TOPICS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8083);
        assert_eq!(config.kafka.subscribed_topics, vec!["users.status-changed".to_string()]);
        assert_eq!(config.expiry.order_expiry_default_minutes, 15);
    }

    #[test]
    #[serial]
    fn env_overrides_take_precedence() {
        std::env::set_var("ORDERS_SERVICE_PORT", "9998");
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 9998);
        std::env::remove_var("ORDERS_SERVICE_PORT");
    }
}
