/// Periodic expiry scanner (C7, spec §4.7): transitions orders past their
/// deadline to `Expired` and appends an `orders.cancelled` outbox row for
/// each one, in the same transaction as the status update.
use crate::config::ExpiryConfig;
use crate::db::OrderRepository;
use crate::models::OrderStatus;
use event_schema::{OrderCancelledEvent, TOPIC_ORDERS_CANCELLED};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use transactional_outbox::{publish_event, OutboxRepository};

pub const EXPIRY_REASON: &str = "timeout";

/// Orders eligible to expire. `Pending` orders are left alone; a customer who
/// never advances past `Pending` has not committed to anything yet.
const EXPIRABLE_STATUSES: &[&str] = &["PendingPayment", "Ready"];

pub async fn run_expiry_scanner<R: OrderRepository, O: OutboxRepository>(
    pool: PgPool,
    orders: Arc<R>,
    outbox: Arc<O>,
    config: ExpiryConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(
        poll_interval_secs = config.poll_interval_secs,
        batch_size = config.batch_size,
        "Expiry scanner starting"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("Expiry scanner received shutdown signal, exiting");
                break;
            }
            result = scan_cycle(&pool, orders.as_ref(), outbox.as_ref(), config.batch_size) => {
                match result {
                    Ok(0) => debug!("No expired orders"),
                    Ok(n) => info!(expired = n, "Expiry scan cycle completed"),
                    Err(e) => error!(error = ?e, "Expiry scan cycle failed"),
                }

                tokio::time::sleep(std::time::Duration::from_secs(config.poll_interval_secs)).await;
            }
        }
    }
}

async fn scan_cycle<R: OrderRepository, O: OutboxRepository>(
    pool: &PgPool,
    orders: &R,
    outbox: &O,
    batch_size: i64,
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let expired = orders
        .find_expired(&mut tx, EXPIRABLE_STATUSES, batch_size)
        .await?;

    let now = chrono::Utc::now();
    for order in &expired {
        orders
            .update_status(
                &mut tx,
                order.id,
                OrderStatus::Expired.as_str(),
                Some(now),
                Some(EXPIRY_REASON),
            )
            .await?;

        let payload = OrderCancelledEvent {
            event_id: uuid::Uuid::new_v4(),
            occurred_at: now,
            order_id: order.id,
            user_id: order.user_id,
            reason: EXPIRY_REASON.to_string(),
        };
        publish_event!(&mut tx, outbox, TOPIC_ORDERS_CANCELLED, order.id, payload)
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    }

    tx.commit().await?;
    Ok(expired.len())
}
