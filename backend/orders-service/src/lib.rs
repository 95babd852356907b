/// Orders Service Library
///
/// Accepts create-order and update-order-status commands over HTTP, persists
/// the Order aggregate, reacts to `users.status-changed` events from the
/// Users service, and periodically expires orders past their deadline.
///
/// # Modules
///
/// - `config`: environment-driven configuration
/// - `error`: `AppError` and its `ResponseError` mapping
/// - `models`: the Order aggregate and its lifecycle status
/// - `db`: the `OrderRepository` persistence layer
/// - `services`: `OrderCommandService`, the transactional command layer
/// - `handlers`: HTTP request handlers
/// - `consumers`: the cross-service consumer subscribed to Users events
/// - `reactions`: idempotent domain reaction handlers invoked by the consumer
/// - `jobs`: the periodic expiry scanner
/// - `relay`: WebSocket fan-out of settled outbox records to UI clients
/// - `validators`: custom `validator` crate rules not covered by its built-ins
pub mod config;
pub mod consumers;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod reactions;
pub mod relay;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, AppResult};
