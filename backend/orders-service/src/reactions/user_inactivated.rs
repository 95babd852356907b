/// Domain reaction to a peer user going Inactive (spec §4.6): cancel every
/// cancellable order the user owns, in one transaction, and append one
/// `orders.cancelled` outbox row per cancelled order.
use crate::db::OrderRepository;
use crate::models::OrderStatus;
use event_schema::{OrderCancelledEvent, TOPIC_ORDERS_CANCELLED};
use idempotent_consumer::{IdempotencyGuard, ProcessingResult};
use sqlx::PgPool;
use std::sync::Arc;
use transactional_outbox::{publish_event, OutboxRepository};
use uuid::Uuid;

pub const CANCELLATION_REASON: &str = "user_inactivated";

const CANCELLABLE_STATUSES: &[&str] = &["Pending", "PendingPayment", "Ready"];

pub struct UserInactivatedReaction<R: OrderRepository, O: OutboxRepository> {
    pool: PgPool,
    orders: Arc<R>,
    outbox: Arc<O>,
    idempotency: Arc<IdempotencyGuard>,
}

impl<R: OrderRepository, O: OutboxRepository> UserInactivatedReaction<R, O> {
    pub fn new(
        pool: PgPool,
        orders: Arc<R>,
        outbox: Arc<O>,
        idempotency: Arc<IdempotencyGuard>,
    ) -> Self {
        Self {
            pool,
            orders,
            outbox,
            idempotency,
        }
    }

    /// Entry point for the consumer (C5). `event_id` is the envelope's
    /// `event_id`, used as the idempotency key; re-delivery of the same
    /// event is a no-op by way of `IdempotencyGuard`, and the per-order
    /// `find_cancellable_for_user` re-check inside the transaction is a
    /// second line of defense if the guard's key is ever reused.
    pub async fn handle(&self, event_id: Uuid, user_id: Uuid) -> anyhow::Result<ProcessingResult> {
        let event_id = event_id.to_string();
        self.idempotency
            .process_if_new(&event_id, || self.cancel_orders(user_id))
            .await
            .map_err(anyhow::Error::from)
    }

    async fn cancel_orders(&self, user_id: Uuid) -> Result<(), anyhow::Error> {
        let mut tx = self.pool.begin().await?;

        let orders = self
            .orders
            .find_cancellable_for_user(&mut tx, user_id, CANCELLABLE_STATUSES)
            .await?;

        let now = chrono::Utc::now();
        for order in &orders {
            self.orders
                .update_status(
                    &mut tx,
                    order.id,
                    OrderStatus::Cancelled.as_str(),
                    Some(now),
                    Some(CANCELLATION_REASON),
                )
                .await?;

            let payload = OrderCancelledEvent {
                event_id: Uuid::new_v4(),
                occurred_at: now,
                order_id: order.id,
                user_id,
                reason: CANCELLATION_REASON.to_string(),
            };
            publish_event!(
                &mut tx,
                self.outbox.as_ref(),
                TOPIC_ORDERS_CANCELLED,
                order.id,
                payload
            )?;
        }

        tx.commit().await?;
        Ok(())
    }
}
