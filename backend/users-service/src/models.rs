/// Domain model for the User aggregate.
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Active" => Some(UserStatus::Active),
            "Inactive" => Some(UserStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn status(&self) -> Option<UserStatus> {
        UserStatus::parse(&self.status)
    }
}

/// Shape accepted from `POST /api/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(custom(function = "crate::validators::validate_non_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// Shape accepted from `PATCH /api/users/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct ChangeUserStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(UserStatus::parse("Active"), Some(UserStatus::Active));
        assert_eq!(UserStatus::parse("bogus"), None);
        assert_eq!(UserStatus::Inactive.as_str(), "Inactive");
    }

    #[test]
    fn create_user_request_rejects_blank_name() {
        let req = CreateUserRequest {
            name: "  ".to_string(),
            email: "a@b.com".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_user_request_rejects_malformed_email() {
        let req = CreateUserRequest {
            name: "Alice".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn create_user_request_accepts_valid_shape() {
        let req = CreateUserRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
