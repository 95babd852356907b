/// Configuration management for Users Service
///
/// Loads typed configuration from environment variables, one struct per
/// concern, mirroring the rest of this workspace's services.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub outbox: OutboxConfig,
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
    pub dead_letter_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
    pub lock_duration_secs: u64,
    pub max_retries: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("USERS_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("USERS_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8082),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/users".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(12),
            },
            kafka: KafkaConfig {
                brokers: std::env::var("KAFKA_BROKERS")
                    .unwrap_or_else(|_| "localhost:9092".to_string()),
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
        std::env::remove_var("USERS_SERVICE_PORT");
        std::env::remove_var("OUTBOX_MAX_RETRIES");

        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8082);
        assert_eq!(config.outbox.max_retries, 5);
        assert_eq!(config.outbox.batch_size, 100);
    }

    #[test]
    #[serial]
    fn env_overrides_take_precedence() {
        std::env::set_var("USERS_SERVICE_PORT", "9999");
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 9999);
        std::env::remove_var("USERS_SERVICE_PORT");
    }
}
