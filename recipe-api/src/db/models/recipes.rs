//! Database models for recipes.

use crate::db::models::attributes::AttributeDBResponse;
use crate::types::{IngredientId, RecipeId, TagId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a recipe. The owner comes from the repository, never the request.
#[derive(Debug, Clone)]
pub struct RecipeCreateDBRequest {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientId>,
}

/// Database request for updating a recipe.
///
/// Link sets are replaced wholesale when `Some`; `Some(vec![])` clears them.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdateDBRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientId>>,
}

/// Database response for a recipe, with its linked tags and ingredients
#[derive(Debug, Clone)]
pub struct RecipeDBResponse {
    pub id: RecipeId,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
    pub user_id: UserId,
    pub tags: Vec<AttributeDBResponse>,
    pub ingredients: Vec<AttributeDBResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing recipes. Empty vectors mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientId>,
}
