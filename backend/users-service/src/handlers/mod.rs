/// HTTP request handlers for the Users Service.
pub mod outbox;
pub mod users;

pub use outbox::{increment_retry, mark_sent, unsent};
pub use users::{change_user_status, create_user, get_user};
