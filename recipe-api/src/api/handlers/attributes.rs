//! Tags and ingredients. Both are a name owned by a user, so they share one implementation and
//! differ only in the [`AttributeKind`] they pass to the repository.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        attributes::{AttributeCreate, AttributeListQuery, AttributeResponse},
        users::CurrentUser,
        validation::ValidJson,
    },
    db::{handlers::Attributes, models::attributes::AttributeKind},
    errors::{Error, Result},
};

async fn list_attributes(
    state: &AppState,
    kind: AttributeKind,
    current_user: &CurrentUser,
    query: &AttributeListQuery,
) -> Result<Json<Vec<AttributeResponse>>> {
    let filter = query.to_filter()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let attributes = Attributes::new(&mut conn, kind, current_user.id).list(&filter).await?;

    Ok(Json(attributes.into_iter().map(AttributeResponse::from).collect()))
}

async fn create_attribute(
    state: &AppState,
    kind: AttributeKind,
    current_user: &CurrentUser,
    request: AttributeCreate,
) -> Result<(StatusCode, Json<AttributeResponse>)> {
    let name = request.name.unwrap_or_default();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let attribute = Attributes::new(&mut conn, kind, current_user.id).create(name.trim()).await?;

    tracing::debug!(id = attribute.id, field = kind.field(), "Created attribute");
    Ok((StatusCode::CREATED, Json(AttributeResponse::from(attribute))))
}

/// List the caller's tags
#[utoipa::path(
    get,
    path = "/recipe/tags/",
    tag = "recipe",
    summary = "List tags",
    params(AttributeListQuery),
    responses(
        (status = 200, description = "The caller's tags, by name descending", body = Vec<AttributeResponse>),
        (status = 400, description = "Invalid query parameter"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn list_tags(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AttributeListQuery>,
) -> Result<Json<Vec<AttributeResponse>>> {
    list_attributes(&state, AttributeKind::Tag, &current_user, &query).await
}

/// Create a tag owned by the caller
#[utoipa::path(
    post,
    path = "/recipe/tags/",
    tag = "recipe",
    summary = "Create tag",
    request_body = AttributeCreate,
    responses(
        (status = 201, description = "Tag created", body = AttributeResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn create_tag(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(request): ValidJson<AttributeCreate>,
) -> Result<(StatusCode, Json<AttributeResponse>)> {
    create_attribute(&state, AttributeKind::Tag, &current_user, request).await
}

/// List the caller's ingredients
#[utoipa::path(
    get,
    path = "/recipe/ingredients/",
    tag = "recipe",
    summary = "List ingredients",
    params(AttributeListQuery),
    responses(
        (status = 200, description = "The caller's ingredients, by name descending", body = Vec<AttributeResponse>),
        (status = 400, description = "Invalid query parameter"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<AttributeListQuery>,
) -> Result<Json<Vec<AttributeResponse>>> {
    list_attributes(&state, AttributeKind::Ingredient, &current_user, &query).await
}

/// Create an ingredient owned by the caller
#[utoipa::path(
    post,
    path = "/recipe/ingredients/",
    tag = "recipe",
    summary = "Create ingredient",
    request_body = AttributeCreate,
    responses(
        (status = 201, description = "Ingredient created", body = AttributeResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(request): ValidJson<AttributeCreate>,
) -> Result<(StatusCode, Json<AttributeResponse>)> {
    create_attribute(&state, AttributeKind::Ingredient, &current_user, request).await
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::attributes::AttributeResponse,
        db::{
            handlers::{Attributes, Repository, Recipes},
            models::{attributes::AttributeFilter, recipes::RecipeCreateDBRequest},
        },
        test_utils::{create_test_app, create_test_ingredient, create_test_tag, create_test_token, create_test_user, token_header},
    };
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    const TAGS_URL: &str = "/api/recipe/tags/";
    const INGREDIENTS_URL: &str = "/api/recipe/ingredients/";

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_required(pool: PgPool) {
        let server = create_test_app(pool).await;

        server.get(TAGS_URL).await.assert_status(StatusCode::UNAUTHORIZED);
        server.get(INGREDIENTS_URL).await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .post(TAGS_URL)
            .json(&json!({"name": "Vegan"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_retrieve_tags_ordered_by_name_desc(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        create_test_tag(&pool, user.id, "Vegan").await;
        create_test_tag(&pool, user.id, "Dessert").await;

        let (name, value) = token_header(&token);
        let response = server.get(TAGS_URL).add_header(name, value).await;
        response.assert_status_ok();

        let tags: Vec<AttributeResponse> = response.json();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Vegan", "Dessert"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_tags_limited_to_user(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let other = create_test_user(&pool, "other@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        create_test_tag(&pool, other.id, "Fruity").await;
        let tag = create_test_tag(&pool, user.id, "Comfort Food").await;

        let (name, value) = token_header(&token);
        let response = server.get(TAGS_URL).add_header(name, value).await;
        response.assert_status_ok();

        let tags: Vec<AttributeResponse> = response.json();
        assert_eq!(tags, vec![AttributeResponse { id: tag.id, name: tag.name }]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_tag_successful(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;

        let (name, value) = token_header(&token);
        let response = server
            .post(TAGS_URL)
            .add_header(name, value)
            .json(&json!({"name": "Test tag", "user_id": 999}))
            .await;
        response.assert_status(StatusCode::CREATED);

        let mut conn = pool.acquire().await.unwrap();
        let tags = Attributes::tags(&mut conn, user.id).list(&AttributeFilter::default()).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Test tag");
        assert_eq!(tags[0].user_id, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_tag_invalid(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;

        let (name, value) = token_header(&token);
        let response = server.post(TAGS_URL).add_header(name, value).json(&json!({"name": ""})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_ingredient_successful(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;

        let (name, value) = token_header(&token);
        let response = server
            .post(INGREDIENTS_URL)
            .add_header(name, value)
            .json(&json!({"name": "Cabbage"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: AttributeResponse = response.json();
        assert_eq!(created.name, "Cabbage");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_retrieve_ingredients_assigned_only_unique(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        let eggs = create_test_ingredient(&pool, user.id, "Eggs").await;
        create_test_ingredient(&pool, user.id, "Cheese").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut recipes = Recipes::new(&mut conn, user.id);
        for title in ["Eggs benedict", "Coriander eggs on toast"] {
            recipes
                .create(&RecipeCreateDBRequest {
                    title: title.to_string(),
                    time_minutes: 20,
                    price: Decimal::new(1000, 2),
                    link: String::new(),
                    tags: vec![],
                    ingredients: vec![eggs.id],
                })
                .await
                .unwrap();
        }

        let (name, value) = token_header(&token);
        let response = server
            .get(INGREDIENTS_URL)
            .add_query_param("assigned_only", 1)
            .add_header(name, value)
            .await;
        response.assert_status_ok();

        let ingredients: Vec<AttributeResponse> = response.json();
        assert_eq!(ingredients, vec![AttributeResponse { id: eggs.id, name: eggs.name }]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assigned_only_must_be_integer(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;

        let (name, value) = token_header(&token);
        let response = server
            .get(TAGS_URL)
            .add_query_param("assigned_only", "yes")
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
