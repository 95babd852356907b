/// Persistence layer for the Order aggregate.
use crate::models::Order;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error>;

    async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        user_id: Uuid,
        product: &str,
        quantity: i32,
        price_cents: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Order, sqlx::Error>;

    async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: &str,
        cancelled_at: Option<DateTime<Utc>>,
        cancellation_reason: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    /// Orders for `user_id` currently in one of `statuses`, locked for update so
    /// a concurrent drainer or scanner can't race the reaction's re-check.
    async fn find_cancellable_for_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        statuses: &[&str],
    ) -> Result<Vec<Order>, sqlx::Error>;

    /// Orders in `statuses` whose `expires_at` has passed, locked for update.
    async fn find_expired(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        statuses: &[&str],
        limit: i64,
    ) -> Result<Vec<Order>, sqlx::Error>;
}

pub struct SqlxOrderRepository {
    pool: PgPool,
}

impl SqlxOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderRepository for SqlxOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, product, quantity, price_cents, status,
                   created_at, updated_at, expires_at, cancelled_at, cancellation_reason
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        user_id: Uuid,
        product: &str,
        quantity: i32,
        price_cents: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, user_id, product, quantity, price_cents, status, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'Pending', $6)
            RETURNING id, user_id, product, quantity, price_cents, status,
                      created_at, updated_at, expires_at, cancelled_at, cancellation_reason
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(product)
        .bind(quantity)
        .bind(price_cents)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await
    }

    async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: &str,
        cancelled_at: Option<DateTime<Utc>>,
        cancellation_reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, cancelled_at = $3, cancellation_reason = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(cancelled_at)
        .bind(cancellation_reason)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    async fn find_cancellable_for_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        statuses: &[&str],
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, product, quantity, price_cents, status,
                   created_at, updated_at, expires_at, cancelled_at, cancellation_reason
            FROM orders
            WHERE user_id = $1
              AND status = ANY($2)
            ORDER BY created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(statuses)
        .fetch_all(&mut **tx)
        .await
    }

    async fn find_expired(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        statuses: &[&str],
        limit: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, product, quantity, price_cents, status,
                   created_at, updated_at, expires_at, cancelled_at, cancellation_reason
            FROM orders
            WHERE status = ANY($1)
              AND expires_at < NOW()
            ORDER BY expires_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(statuses)
        .bind(limit)
        .fetch_all(&mut **tx)
        .await
    }
}
