//! Common type definitions.
//!
//! All entity IDs are `BIGSERIAL` primary keys wrapped in type aliases so signatures say which
//! table an id belongs to:
//!
//! - [`UserId`]: User account identifier
//! - [`TagId`]: Tag identifier
//! - [`IngredientId`]: Ingredient identifier
//! - [`RecipeId`]: Recipe identifier
//!
//! # Utility Functions
//!
//! - [`parse_id_list`]: Parse comma-separated id lists from query strings (`?tags=1,2`)

use std::num::ParseIntError;

// Type aliases for IDs
pub type UserId = i64;
pub type TagId = i64;
pub type IngredientId = i64;
pub type RecipeId = i64;

/// Parse a comma-separated list of ids, e.g. "1,2, 3" -> [1, 2, 3].
/// Empty segments are skipped so that trailing commas are tolerated.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<i64>)
        .collect()
}
