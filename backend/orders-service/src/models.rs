/// Domain model for the Order aggregate.
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of an Order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OrderStatus {
    Pending,
    PendingPayment,
    Ready,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::Ready => "Ready",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Expired => "Expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(OrderStatus::Pending),
            "PendingPayment" => Some(OrderStatus::PendingPayment),
            "Ready" => Some(OrderStatus::Ready),
            "Completed" => Some(OrderStatus::Completed),
            "Cancelled" => Some(OrderStatus::Cancelled),
            "Expired" => Some(OrderStatus::Expired),
            _ => None,
        }
    }

    /// Statuses a cancellation reaction (C6) or the expiry scanner (C7) may
    /// still act on. `Completed`, `Cancelled` and `Expired` are terminal.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::PendingPayment | OrderStatus::Ready
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_cancellable()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product: String,
    pub quantity: i32,
    pub price_cents: i64,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub cancelled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub cancellation_reason: Option<String>,
}

impl Order {
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::parse(&self.status)
    }
}

/// Shape accepted from `POST /api/orders`. The peer existence check for
/// `user_id` happens in the service layer, since it requires a network call
/// rather than a pure syntactic check.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    #[validate(custom(function = "crate::validators::validate_non_blank"))]
    pub product: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(range(min = 1, message = "price_cents must be positive"))]
    pub price_cents: i64,
}

/// Shape accepted from `PATCH /api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(OrderStatus::parse("Ready"), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::parse("bogus"), None);
        assert_eq!(OrderStatus::PendingPayment.as_str(), "PendingPayment");
    }

    #[test]
    fn cancellable_set_matches_non_terminal_statuses() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::PendingPayment.is_cancellable());
        assert!(OrderStatus::Ready.is_cancellable());
        assert!(!OrderStatus::Completed.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
        assert!(!OrderStatus::Expired.is_cancellable());
    }

    #[test]
    fn create_order_request_rejects_blank_product() {
        let req = CreateOrderRequest {
            user_id: Uuid::new_v4(),
            product: "  ".to_string(),
            quantity: 1,
            price_cents: 500,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_order_request_rejects_nonpositive_quantity() {
        let req = CreateOrderRequest {
            user_id: Uuid::new_v4(),
            product: "Widget".to_string(),
            quantity: 0,
            price_cents: 500,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_order_request_rejects_nonpositive_price() {
        let req = CreateOrderRequest {
            user_id: Uuid::new_v4(),
            product: "Widget".to_string(),
            quantity: 1,
            price_cents: 0,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_order_request_accepts_valid_shape() {
        let req = CreateOrderRequest {
            user_id: Uuid::new_v4(),
            product: "Widget".to_string(),
            quantity: 2,
            price_cents: 1999,
        };
        assert!(req.validate().is_ok());
    }
}
