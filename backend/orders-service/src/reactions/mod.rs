/// Idempotent domain reaction handlers (C6) invoked by the cross-service
/// consumer.
pub mod user_inactivated;

pub use user_inactivated::UserInactivatedReaction;
