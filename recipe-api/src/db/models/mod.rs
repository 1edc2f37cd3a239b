//! Database models: the request and response types that repositories accept and return.

pub mod attributes;
pub mod catalog;
pub mod recipes;
pub mod users;
