//! API request/response models for users and tokens.

use crate::{
    api::models::validation::{
        BLANK, FieldErrors, MAX_TEXT_LENGTH, Validate, check_email, check_password, check_text, required,
    },
    config::Config,
    db::models::users::UserDBResponse,
    types::UserId,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Registration payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserCreate {
    #[schema(example = "cook@example.com")]
    pub email: Option<String>,
    #[schema(example = "testpass123")]
    pub password: Option<String>,
    #[schema(example = "Test Cook")]
    pub name: Option<String>,
}

/// Rules shared by registration and full profile replacement: every field present and valid
fn validate_full_profile(
    email: &Option<String>,
    password: &Option<String>,
    name: &Option<String>,
    config: &Config,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if let Some(email) = required(&mut errors, "email", email) {
        check_email(&mut errors, "email", email);
    }
    if let Some(password) = required(&mut errors, "password", password) {
        check_password(&mut errors, "password", password, config);
    }
    if let Some(name) = required(&mut errors, "name", name) {
        check_text(&mut errors, "name", name, MAX_TEXT_LENGTH);
    }
    errors.into_result()
}

impl Validate for UserCreate {
    fn validate(&self, config: &Config) -> Result<(), FieldErrors> {
        validate_full_profile(&self.email, &self.password, &self.name, config)
    }
}

/// Profile update payload.
///
/// Used for both PUT and PATCH on `/api/user/me`; PUT additionally requires every field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserUpdate {
    /// Full-replacement rules, as for registration
    pub fn validate_full(&self, config: &Config) -> Result<(), FieldErrors> {
        validate_full_profile(&self.email, &self.password, &self.name, config)
    }
}

impl Validate for UserUpdate {
    /// Partial-update rules: only provided fields are checked
    fn validate(&self, config: &Config) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(email) = &self.email {
            check_email(&mut errors, "email", email);
        }
        if let Some(password) = &self.password {
            check_password(&mut errors, "password", password, config);
        }
        if let Some(name) = &self.name {
            check_text(&mut errors, "name", name, MAX_TEXT_LENGTH);
        }
        errors.into_result()
    }
}

/// Public profile representation. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            email: db.email,
            name: db.name,
        }
    }
}

/// Credentials exchanged for an API token
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct TokenRequest {
    #[schema(example = "cook@example.com")]
    pub email: Option<String>,
    #[schema(example = "testpass123")]
    pub password: Option<String>,
}

impl Validate for TokenRequest {
    fn validate(&self, _config: &Config) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(email) = required(&mut errors, "email", &self.email)
            && email.trim().is_empty()
        {
            errors.add("email", BLANK);
        }
        // Passwords are not trimmed: a password of spaces is still a password
        if let Some(password) = required(&mut errors, "password", &self.password)
            && password.is_empty()
        {
            errors.add("password", BLANK);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// The authenticated caller, resolved from an API token or an admin session cookie
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            name: db.name,
            is_staff: db.is_staff,
            is_superuser: db.is_superuser,
        }
    }
}
