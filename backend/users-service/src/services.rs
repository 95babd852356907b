/// Transactional command layer: validates a command, mutates the User
/// aggregate, and appends the matching outbox row in the same transaction.
use crate::db::{SqlxUserRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::models::{ChangeUserStatusRequest, CreateUserRequest, User, UserStatus};
use chrono::Utc;
use event_schema::{UserCreatedEvent, UserStatusChangedEvent, TOPIC_USERS_CREATED, TOPIC_USERS_STATUS_CHANGED};
use sqlx::PgPool;
use std::sync::Arc;
use transactional_outbox::{publish_event, OutboxRepository, SqlxOutboxRepository};
use uuid::Uuid;
use validator::Validate;

/// Concrete service wiring used by `main` and the HTTP handlers.
pub type UserService = UserCommandService<SqlxUserRepository, SqlxOutboxRepository>;

pub struct UserCommandService<R: UserRepository, O: OutboxRepository> {
    pool: PgPool,
    repo: Arc<R>,
    outbox: Arc<O>,
}

impl<R: UserRepository, O: OutboxRepository> UserCommandService<R, O> {
    pub fn new(pool: PgPool, repo: Arc<R>, outbox: Arc<O>) -> Self {
        Self { pool, repo, outbox }
    }

    pub async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
    }

    /// Create-User (spec §4.4): verify email uniqueness, insert Active user,
    /// append `users.created`, commit.
    pub async fn create_user(&self, req: CreateUserRequest) -> AppResult<User> {
        req.validate()?;

        if self.repo.email_taken(&req.email).await? {
            return Err(AppError::Conflict(format!(
                "email {} already registered",
                req.email
            )));
        }

        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();

        let user = self.repo.insert(&mut tx, id, &req.name, &req.email).await;
        let user = match user {
            Ok(user) => user,
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                return Err(AppError::Conflict(format!(
                    "email {} already registered",
                    req.email
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let payload = UserCreatedEvent {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        };
        publish_event!(&mut tx, self.outbox.as_ref(), TOPIC_USERS_CREATED, user.id, payload)?;

        tx.commit().await?;

        Ok(user)
    }

    /// Change-User-Status (spec §4.4): no-op on unchanged status writes
    /// nothing to the outbox.
    pub async fn change_user_status(
        &self,
        id: Uuid,
        req: ChangeUserStatusRequest,
    ) -> AppResult<()> {
        let target = UserStatus::parse(&req.status)
            .ok_or_else(|| AppError::Validation(format!("unknown status '{}'", req.status)))?;

        let current = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;

        let current_status = current
            .status()
            .ok_or_else(|| AppError::Internal(format!("stored status '{}' is invalid", current.status)))?;

        if current_status == target {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        self.repo.update_status(&mut tx, id, target.as_str()).await?;

        let payload = UserStatusChangedEvent {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            user_id: id,
            old_status: current_status.as_str().to_string(),
            new_status: target.as_str().to_string(),
            reason: req.reason,
        };
        publish_event!(&mut tx, self.outbox.as_ref(), TOPIC_USERS_STATUS_CHANGED, id, payload)?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // `UserCommandService` is exercised end-to-end against a real Postgres
    // instance in integration tests; the no-op / validation branches are
    // covered at the unit level in `models.rs`.
}
