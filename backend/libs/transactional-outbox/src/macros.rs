//! Convenience macros for working with the outbox.

/// Append an event to the outbox within a transaction.
///
/// This macro simplifies the common pattern of calling
/// [`OutboxRepository::append`](crate::OutboxRepository::append) from inside a
/// domain write's transaction.
///
/// # Usage
///
/// ```rust,no_run
/// use transactional_outbox::{publish_event, SqlxOutboxRepository};
/// use sqlx::PgPool;
/// use uuid::Uuid;
/// use serde_json::json;
///
/// # async fn example(pool: PgPool, repo: SqlxOutboxRepository) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
/// let user_id = Uuid::new_v4();
///
/// sqlx::query("INSERT INTO users (id, name) VALUES ($1, $2)")
///     .bind(user_id)
///     .bind("Alice")
///     .execute(&mut *tx)
///     .await?;
///
/// publish_event!(
///     &mut tx,
///     &repo,
///     "users.created",
///     user_id,
///     json!({ "id": user_id, "name": "Alice" })
/// )?;
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Arguments
///
/// * `$tx` - Mutable reference to the active database transaction
/// * `$repo` - Reference to an `OutboxRepository` implementation
/// * `$event_type` - Event type string (e.g., "users.created")
/// * `$aggregate_id` - UUID of the aggregate the event relates to
/// * `$payload` - JSON-serializable payload
#[macro_export]
macro_rules! publish_event {
    ($tx:expr, $repo:expr, $event_type:expr, $aggregate_id:expr, $payload:expr) => {{
        $repo.append($tx, $event_type, $aggregate_id, &$payload).await
    }};
}

#[cfg(test)]
mod tests {
    // Macro tests are compile-time checks.
    // If this file compiles, the macro is syntactically correct.
}
