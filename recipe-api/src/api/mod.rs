//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Users** (`/api/user/*`): Registration, token exchange and the caller's own profile
//! - **Tags** (`/api/recipe/tags/*`): The caller's tags
//! - **Ingredients** (`/api/recipe/ingredients/*`): The caller's ingredients
//! - **Recipes** (`/api/recipe/recipes/*`): The caller's recipes and their images
//!
//! Every resource under `/api/recipe/` is scoped to the authenticated user: other users' rows
//! are invisible, and ids that belong to someone else behave as if they do not exist.
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The OpenAPI document is served at `/api/openapi.json` and a
//! browsable reference at `/api/docs`.

pub mod handlers;
pub mod models;
