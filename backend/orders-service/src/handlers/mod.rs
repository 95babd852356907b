/// HTTP request handlers for the Orders Service.
pub mod orders;
pub mod outbox;

pub use orders::{create_order, get_order, update_order_status};
pub use outbox::{increment_retry, mark_sent, unsent};
