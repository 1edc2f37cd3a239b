//! Repository implementations, one per table (or pair of tables for tags and ingredients).

pub mod attributes;
pub mod catalog;
pub mod recipes;
pub mod repository;
pub mod tokens;
pub mod users;

pub use attributes::Attributes;
pub use catalog::Catalog;
pub use recipes::Recipes;
pub use repository::Repository;
pub use tokens::Tokens;
pub use users::Users;
