//! Database models for the unscoped admin listings.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogAttribute {
    pub id: i64,
    pub name: String,
    pub owner_email: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogRecipe {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub owner_email: String,
}

/// Row counts shown on the admin index
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct CatalogCounts {
    pub users: i64,
    pub tags: i64,
    pub ingredients: i64,
    pub recipes: i64,
}
