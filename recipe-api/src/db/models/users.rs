//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Lowercase and trim an email address. Lookups and inserts both go through this so that
/// `Foo@Example.com` and `foo@example.com` are the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl UserCreateDBRequest {
    /// A regular, active, non-staff account
    pub fn user(email: &str, name: &str, password_hash: Option<String>) -> Self {
        Self {
            email: normalize_email(email),
            name: name.to_string(),
            password_hash,
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    /// An account with both staff and superuser flags set
    pub fn superuser(email: &str, password_hash: Option<String>) -> Self {
        Self {
            is_staff: true,
            is_superuser: true,
            ..Self::user(email, "", password_hash)
        }
    }
}

/// Database request for updating a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
