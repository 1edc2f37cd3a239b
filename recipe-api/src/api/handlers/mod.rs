//! HTTP request handlers for all API endpoints.
//!
//! Each handler is responsible for:
//! - Request validation and deserialization (through [`ValidJson`](crate::api::models::validation::ValidJson))
//! - Authentication, by taking a [`CurrentUser`](crate::api::models::users::CurrentUser) argument
//! - Calling the owner-scoped repositories in [`crate::db::handlers`]
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`users`]: Registration, token issuance and the caller's own profile
//! - [`attributes`]: Tags and ingredients
//! - [`recipes`]: Recipe CRUD and image upload
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching status code. Field
//! validation failures come back as `{"field": ["message"]}`.

pub mod attributes;
pub mod recipes;
pub mod users;
