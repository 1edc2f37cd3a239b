//! API request and response data models.
//!
//! These are distinct from the database models in [`crate::db::models`]: request bodies have
//! every field optional so that missing fields can be reported per field, and responses never
//! carry internal columns such as password hashes or owner ids.
//!
//! - [`users`]: Registration, profile, token and current-user payloads
//! - [`attributes`]: Tags and ingredients
//! - [`recipes`]: Recipe payloads, list filters and image upload responses
//! - [`validation`]: Field-level validation and the [`ValidJson`](validation::ValidJson) extractor

pub mod attributes;
pub mod recipes;
pub mod users;
pub mod validation;
