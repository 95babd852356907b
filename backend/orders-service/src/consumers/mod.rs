/// Cross-service consumer (C5) subscribed to Users-service events.
pub mod status_consumer;

pub use status_consumer::StatusConsumer;
