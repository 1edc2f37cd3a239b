//! OpenAPI documentation for the REST API under `/api`.
//!
//! The document is served at `/api/openapi.json` and browsable at `/api/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// `Authorization: Token <key>` authentication
struct TokenSecurityAddon;

impl Modify for TokenSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "TokenAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token authentication. Obtain a key from `POST /api/user/token/` and send it as:\n\n\
                    ```\nAuthorization: Token YOUR_KEY\n```",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recipe API",
        description = "Manage recipes, tags and ingredients. Every resource is private to the user who created it.",
    ),
    servers(
        (url = "/api", description = "Recipe API")
    ),
    modifiers(&TokenSecurityAddon),
    paths(
        api::handlers::users::create_user,
        api::handlers::users::create_token,
        api::handlers::users::get_me,
        api::handlers::users::replace_me,
        api::handlers::users::update_me,
        api::handlers::attributes::list_tags,
        api::handlers::attributes::create_tag,
        api::handlers::attributes::list_ingredients,
        api::handlers::attributes::create_ingredient,
        api::handlers::recipes::list_recipes,
        api::handlers::recipes::create_recipe,
        api::handlers::recipes::get_recipe,
        api::handlers::recipes::replace_recipe,
        api::handlers::recipes::update_recipe,
        api::handlers::recipes::delete_recipe,
        api::handlers::recipes::upload_image,
    ),
    components(
        schemas(
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::users::TokenRequest,
            api::models::users::TokenResponse,
            api::models::attributes::AttributeCreate,
            api::models::attributes::AttributeResponse,
            api::models::recipes::RecipeCreate,
            api::models::recipes::RecipeUpdate,
            api::models::recipes::RecipeResponse,
            api::models::recipes::RecipeDetailResponse,
            api::models::recipes::RecipeImageResponse,
            api::models::recipes::RecipeImageUpload,
        )
    ),
    tags(
        (name = "user", description = "Registration, tokens and the caller's profile"),
        (name = "recipe", description = "Recipes, tags and ingredients owned by the caller"),
    )
)]
pub struct ApiDoc;
