//! Error types for the transactional outbox library.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;

/// Errors that can occur during outbox operations.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Database operation failed
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Row not found in outbox (e.g. settling a row another drainer already settled)
    #[error("Outbox row not found: {0}")]
    RowNotFound(Uuid),

    /// Publish to the bus failed but the row should be retried
    #[error("Transient publish failure: {0}")]
    Transient(String),

    /// Publish failed in a way that is not worth retrying (payload unrecoverable,
    /// or retries exhausted and the dead-letter publish itself failed)
    #[error("Permanent publish failure: {0}")]
    Permanent(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error with context
    #[error("Outbox error: {0}")]
    Other(#[from] anyhow::Error),
}
