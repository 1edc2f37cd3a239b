//! Authentication.
//!
//! # Authentication Methods
//!
//! ## 1. API Token Authentication
//!
//! Used by API clients:
//! - A user exchanges email and password for a token at `POST /api/user/token/`
//! - Each user has exactly one token; later requests return the same one
//! - Passed in `Authorization: Token <key>` (`Bearer <key>` is also accepted)
//! - Tokens do not expire; deactivating the user disables the token
//!
//! ## 2. Session Authentication
//!
//! Used by the admin site:
//! - Staff log in at `/admin/login/` with email and password
//! - A signed JWT is stored in an HTTP-only cookie
//! - The user is reloaded on every request, so deactivation takes effect immediately
//!
//! # Modules
//!
//! - [`current_user`]: The [`CurrentUser`](crate::api::models::users::CurrentUser) extractor
//! - [`password`]: Password hashing and verification using Argon2
//! - [`session`]: Session token and cookie handling
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use recipe_api::api::models::users::CurrentUser;
//!
//! async fn protected_handler(current_user: CurrentUser) -> String {
//!     format!("Hello, {}!", current_user.email)
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod session;
