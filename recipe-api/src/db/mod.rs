//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries, owner scoping)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Ownership scoping
//!
//! [`handlers::Recipes`] and [`handlers::Attributes`] take the owning user id at construction
//! and add `user_id = owner` to every statement they run. A handler that only has an
//! authenticated user can therefore never touch another user's rows:
//!
//! ```ignore
//! use recipe_api::db::handlers::{Recipes, Repository};
//!
//! async fn example(pool: &sqlx::PgPool, owner: i64) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = pool.acquire().await?;
//!     let mut recipes = Recipes::new(&mut conn, owner);
//!
//!     // Only this owner's recipes
//!     let mine = recipes.list(&Default::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Transactions
//!
//! Writes that span several tables (a recipe and its link tables) open their own transaction
//! inside the repository, so a plain pooled connection is enough for callers.

pub mod errors;
pub mod handlers;
pub mod models;
