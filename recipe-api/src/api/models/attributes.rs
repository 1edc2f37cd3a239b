//! API request/response models for tags and ingredients.

use crate::{
    api::models::validation::{FieldErrors, MAX_TEXT_LENGTH, Validate, check_text, required},
    config::Config,
    db::models::attributes::{AttributeDBResponse, AttributeFilter},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Payload for creating a tag or an ingredient
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AttributeCreate {
    #[schema(example = "Vegan")]
    pub name: Option<String>,
}

impl Validate for AttributeCreate {
    fn validate(&self, _config: &Config) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = required(&mut errors, "name", &self.name) {
            check_text(&mut errors, "name", name, MAX_TEXT_LENGTH);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttributeResponse {
    pub id: i64,
    pub name: String,
}

impl From<AttributeDBResponse> for AttributeResponse {
    fn from(db: AttributeDBResponse) -> Self {
        Self { id: db.id, name: db.name }
    }
}

/// Query parameters for listing tags and ingredients
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttributeListQuery {
    /// `1` to only return items used by at least one of your recipes
    #[param(example = "1")]
    pub assigned_only: Option<String>,
}

impl AttributeListQuery {
    /// Any non-zero integer enables the filter; absent means `0`
    pub fn to_filter(&self) -> Result<AttributeFilter, FieldErrors> {
        let assigned_only = match self.assigned_only.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(raw) => raw
                .parse::<i64>()
                .map(|value| value != 0)
                .map_err(|_| FieldErrors::single("assigned_only", "A valid integer is required."))?,
        };
        Ok(AttributeFilter { assigned_only })
    }
}
