//! Database models for recipe attributes (tags and ingredients).

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Which attribute table a repository operates on.
///
/// Tags and ingredients have the same shape and the same ownership rules, so they share a
/// repository; the kind only decides which tables the SQL touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    /// Join table linking recipes to this attribute
    pub fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    /// Column in the join table holding the attribute id
    pub fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Name of the request field carrying ids of this kind
    pub fn field(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }
}

/// Database response for a tag or ingredient
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AttributeDBResponse {
    pub id: i64,
    pub name: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing attributes
#[derive(Debug, Clone, Default)]
pub struct AttributeFilter {
    /// Only return attributes linked to at least one of the owner's recipes
    pub assigned_only: bool,
}
