//! API request/response models for recipes.

use crate::{
    api::models::{
        attributes::AttributeResponse,
        validation::{
            FieldErrors, MAX_TEXT_LENGTH, Validate, check_optional_text, check_price, check_text, required,
        },
    },
    config::Config,
    db::models::recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeFilter, RecipeUpdateDBRequest},
    types::{IngredientId, RecipeId, TagId, parse_id_list},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Full recipe payload, used for create and for PUT.
///
/// Omitting `tags` or `ingredients` means "none": on PUT that clears the existing links.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RecipeCreate {
    #[schema(example = "Chocolate cheesecake")]
    pub title: Option<String>,
    #[schema(example = 5)]
    pub time_minutes: Option<i32>,
    #[schema(value_type = Option<String>, example = "5.00")]
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientId>>,
}

impl Validate for RecipeCreate {
    fn validate(&self, _config: &Config) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = required(&mut errors, "title", &self.title) {
            check_text(&mut errors, "title", title, MAX_TEXT_LENGTH);
        }
        required(&mut errors, "time_minutes", &self.time_minutes);
        if let Some(price) = required(&mut errors, "price", &self.price) {
            check_price(&mut errors, "price", price);
        }
        if let Some(link) = &self.link {
            check_optional_text(&mut errors, "link", link, MAX_TEXT_LENGTH);
        }
        errors.into_result()
    }
}

impl RecipeCreate {
    /// Call only after validation has succeeded
    pub fn into_create_request(self) -> RecipeCreateDBRequest {
        RecipeCreateDBRequest {
            title: self.title.unwrap_or_default(),
            time_minutes: self.time_minutes.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            ingredients: self.ingredients.unwrap_or_default(),
        }
    }

    /// PUT semantics: every field is written and link sets are always replaced
    pub fn into_replace_request(self) -> RecipeUpdateDBRequest {
        let create = self.into_create_request();
        RecipeUpdateDBRequest {
            title: Some(create.title),
            time_minutes: Some(create.time_minutes),
            price: Some(create.price),
            link: Some(create.link),
            tags: Some(create.tags),
            ingredients: Some(create.ingredients),
        }
    }
}

/// Partial recipe payload for PATCH. Only provided fields change; a provided `tags` list
/// replaces the whole tag set.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    #[schema(value_type = Option<String>, example = "5.00")]
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientId>>,
}

impl Validate for RecipeUpdate {
    fn validate(&self, _config: &Config) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_text(&mut errors, "title", title, MAX_TEXT_LENGTH);
        }
        if let Some(price) = &self.price {
            check_price(&mut errors, "price", price);
        }
        if let Some(link) = &self.link {
            check_optional_text(&mut errors, "link", link, MAX_TEXT_LENGTH);
        }
        errors.into_result()
    }
}

impl From<RecipeUpdate> for RecipeUpdateDBRequest {
    fn from(api: RecipeUpdate) -> Self {
        Self {
            title: api.title,
            time_minutes: api.time_minutes,
            price: api.price,
            link: api.link,
            tags: api.tags,
            ingredients: api.ingredients,
        }
    }
}

/// Build the public URL of a stored image path
pub fn image_url(media_url: &str, path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{media_url}{p}"))
}

/// Recipe as returned by list, create and update: links are ids only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub id: RecipeId,
    pub title: String,
    pub time_minutes: i32,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientId>,
    pub image: Option<String>,
}

impl RecipeResponse {
    pub fn from_db(db: RecipeDBResponse, media_url: &str) -> Self {
        Self {
            id: db.id,
            title: db.title,
            time_minutes: db.time_minutes,
            price: db.price,
            link: db.link,
            tags: db.tags.into_iter().map(|t| t.id).collect(),
            ingredients: db.ingredients.into_iter().map(|i| i.id).collect(),
            image: image_url(media_url, db.image.as_deref()),
        }
    }
}

/// Recipe detail: tags and ingredients are nested objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeDetailResponse {
    pub id: RecipeId,
    pub title: String,
    pub time_minutes: i32,
    #[schema(value_type = String, example = "5.00")]
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<AttributeResponse>,
    pub ingredients: Vec<AttributeResponse>,
    pub image: Option<String>,
}

impl RecipeDetailResponse {
    pub fn from_db(db: RecipeDBResponse, media_url: &str) -> Self {
        Self {
            id: db.id,
            title: db.title,
            time_minutes: db.time_minutes,
            price: db.price,
            link: db.link,
            tags: db.tags.into_iter().map(AttributeResponse::from).collect(),
            ingredients: db.ingredients.into_iter().map(AttributeResponse::from).collect(),
            image: image_url(media_url, db.image.as_deref()),
        }
    }
}

/// Response of an image upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeImageResponse {
    pub id: RecipeId,
    pub image: Option<String>,
}

/// Multipart body of an image upload, for the API docs only
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct RecipeImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Query parameters for listing recipes
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecipeListQuery {
    /// Comma-separated tag ids; recipes with any of them are returned
    #[param(example = "1,2")]
    pub tags: Option<String>,
    /// Comma-separated ingredient ids; recipes with any of them are returned
    #[param(example = "3")]
    pub ingredients: Option<String>,
}

impl RecipeListQuery {
    pub fn to_filter(&self) -> Result<RecipeFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut parse = |field: &str, raw: &Option<String>| match raw.as_deref() {
            None => Vec::new(),
            Some(raw) => parse_id_list(raw).unwrap_or_else(|_| {
                errors.add(field, "Enter a comma-separated list of ids.");
                Vec::new()
            }),
        };
        let tags = parse("tags", &self.tags);
        let ingredients = parse("ingredients", &self.ingredients);
        errors.into_result()?;
        Ok(RecipeFilter { tags, ingredients })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn valid_create() -> RecipeCreate {
        RecipeCreate {
            title: Some("Chocolate cheesecake".to_string()),
            time_minutes: Some(30),
            price: Some(Decimal::from_str("5.00").unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_validation() {
        let config = Config::default();
        assert!(valid_create().validate(&config).is_ok());

        let errors = RecipeCreate::default().validate(&config).unwrap_err();
        for field in ["title", "time_minutes", "price"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }

        let too_precise = RecipeCreate {
            price: Some(Decimal::from_str("5.005").unwrap()),
            ..valid_create()
        };
        assert!(too_precise.validate(&config).unwrap_err().get("price").is_some());
    }

    #[test]
    fn test_price_accepts_string_or_number() {
        let from_string: RecipeCreate = serde_json::from_str(r#"{"price": "5.00"}"#).unwrap();
        let from_number: RecipeCreate = serde_json::from_str(r#"{"price": 5.5}"#).unwrap();
        assert_eq!(from_string.price, Some(Decimal::new(500, 2)));
        assert_eq!(from_number.price.map(|p| p.normalize()), Some(Decimal::new(55, 1)));
    }

    #[test]
    fn test_replace_request_clears_missing_links() {
        let replace = valid_create().into_replace_request();
        assert_eq!(replace.tags, Some(vec![]));
        assert_eq!(replace.ingredients, Some(vec![]));
        assert_eq!(replace.link.as_deref(), Some(""));
    }

    #[test]
    fn test_partial_update_leaves_missing_links() {
        let update: RecipeUpdate = serde_json::from_str(r#"{"tags": [3]}"#).unwrap();
        let db = RecipeUpdateDBRequest::from(update);
        assert_eq!(db.tags, Some(vec![3]));
        assert_eq!(db.ingredients, None);
    }

    #[test]
    fn test_list_query_parsing() {
        let query = RecipeListQuery {
            tags: Some("1,2".to_string()),
            ingredients: None,
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.tags, vec![1, 2]);
        assert!(filter.ingredients.is_empty());

        let bad = RecipeListQuery {
            tags: None,
            ingredients: Some("1,x".to_string()),
        };
        assert!(bad.to_filter().unwrap_err().get("ingredients").is_some());
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("/media/", Some("uploads/recipe/a.jpg")).as_deref(),
            Some("/media/uploads/recipe/a.jpg")
        );
        assert_eq!(image_url("/media/", None), None);
    }
}
