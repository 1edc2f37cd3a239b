//! Field-level request validation.
//!
//! Request bodies are deserialized into structs whose fields are all optional, then checked with
//! [`Validate`]. Failures are collected per field and returned to the client as
//! `{"field": ["message", ...]}` with status 400, so a client sees every problem at once.

use crate::{AppState, config::Config, errors::Error};
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::BTreeMap, fmt};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Max digits and decimal places of `recipes.price` (NUMERIC(5, 2))
pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Max length of the VARCHAR(255) text columns
pub const MAX_TEXT_LENGTH: usize = 255;

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` if nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Request payloads that can check themselves against the running configuration
pub trait Validate {
    fn validate(&self, config: &Config) -> Result<(), FieldErrors>;
}

/// JSON body extractor that deserializes and then runs [`Validate`].
///
/// Malformed bodies are reported under `non_field_errors` with status 400, matching the shape
/// of every other validation failure.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T> FromRequest<AppState> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::Validation(FieldErrors::single(NON_FIELD_ERRORS, rejection.body_text())))?;

        value.validate(&state.config)?;
        Ok(Self(value))
    }
}

/// Check a required field is present, returning it if so
pub fn required<'a, T>(errors: &mut FieldErrors, field: &str, value: &'a Option<T>) -> Option<&'a T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value.as_ref()
}

/// Non-blank text no longer than `max_length` characters
pub fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max_length: usize) {
    if value.trim().is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > max_length {
        errors.add(field, format!("Ensure this field has no more than {max_length} characters."));
    }
}

/// Optional text that may be blank but not longer than `max_length` characters
pub fn check_optional_text(errors: &mut FieldErrors, field: &str, value: &str, max_length: usize) {
    if value.chars().count() > max_length {
        errors.add(field, format!("Ensure this field has no more than {max_length} characters."));
    }
}

/// Roughly `local@domain.tld`, without whitespace
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > MAX_TEXT_LENGTH {
        errors.add(field, format!("Ensure this field has no more than {MAX_TEXT_LENGTH} characters."));
    } else if !is_valid_email(value.trim()) {
        errors.add(field, INVALID_EMAIL);
    }
}

/// Password length bounds from `auth.password`
pub fn check_password(errors: &mut FieldErrors, field: &str, value: &str, config: &Config) {
    let rules = &config.auth.password;
    let length = value.chars().count();
    if value.is_empty() {
        errors.add(field, BLANK);
    } else if length < rules.min_length {
        errors.add(field, format!("Ensure this field has at least {} characters.", rules.min_length));
    } else if length > rules.max_length {
        errors.add(field, format!("Ensure this field has no more than {} characters.", rules.max_length));
    }
}

/// Price must fit NUMERIC(5, 2)
pub fn check_price(errors: &mut FieldErrors, field: &str, value: &Decimal) {
    let normalized = value.normalize();
    let decimal_places = normalized.scale();
    let mantissa = normalized.mantissa().unsigned_abs();
    let total_digits = if mantissa == 0 { 1 } else { mantissa.ilog10() + 1 };
    let whole_digits = total_digits.saturating_sub(decimal_places);

    if total_digits > PRICE_MAX_DIGITS {
        errors.add(
            field,
            format!("Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."),
        );
    } else if decimal_places > PRICE_DECIMAL_PLACES {
        errors.add(
            field,
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
    } else if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        errors.add(
            field,
            format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
            ),
        );
    }
}

/// Message for a related id the caller cannot use
pub fn invalid_pk(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}
