use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::{
        recipes::{
            RecipeCreate, RecipeDetailResponse, RecipeImageResponse, RecipeImageUpload, RecipeListQuery, RecipeResponse,
            RecipeUpdate, image_url,
        },
        users::CurrentUser,
        validation::{FieldErrors, ValidJson, invalid_pk},
    },
    db::{
        handlers::{Attributes, Recipes, Repository},
        models::{attributes::AttributeKind, recipes::RecipeUpdateDBRequest},
    },
    errors::{Error, Result},
    media,
    types::{IngredientId, RecipeId, TagId, UserId},
};

/// Reject tag or ingredient ids the caller does not own, reporting each under its field
async fn check_owned_links(
    conn: &mut PgConnection,
    owner: UserId,
    tags: Option<&[TagId]>,
    ingredients: Option<&[IngredientId]>,
) -> Result<()> {
    let mut errors = FieldErrors::new();
    for (kind, ids) in [(AttributeKind::Tag, tags), (AttributeKind::Ingredient, ingredients)] {
        let Some(ids) = ids.filter(|ids| !ids.is_empty()) else {
            continue;
        };
        for id in Attributes::new(&mut *conn, kind, owner).missing_ids(ids).await? {
            errors.add(kind.field(), invalid_pk(id));
        }
    }
    Ok(errors.into_result()?)
}

/// Body length limit hits surface as 413, every other multipart failure as 400
fn multipart_error(e: MultipartError, context: &str, max_size: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(max_size, "Image upload exceeds body limit, aborting");
        Error::PayloadTooLarge {
            message: format!("File size exceeds maximum allowed size of {max_size} bytes"),
        }
    } else {
        Error::BadRequest {
            message: format!("{context}: {e}"),
        }
    }
}

fn recipe_not_found(id: RecipeId) -> Error {
    Error::NotFound {
        resource: "Recipe".to_string(),
        id: id.to_string(),
    }
}

/// List the caller's recipes
#[utoipa::path(
    get,
    path = "/recipe/recipes/",
    tag = "recipe",
    summary = "List recipes",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "The caller's recipes, by id", body = Vec<RecipeResponse>),
        (status = 400, description = "Malformed id list"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeResponse>>> {
    let filter = query.to_filter()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let recipes = Recipes::new(&mut conn, current_user.id).list(&filter).await?;

    let media_url = &state.config.media.url;
    Ok(Json(
        recipes.into_iter().map(|r| RecipeResponse::from_db(r, media_url)).collect(),
    ))
}

/// Create a recipe owned by the caller
#[utoipa::path(
    post,
    path = "/recipe/recipes/",
    tag = "recipe",
    summary = "Create recipe",
    request_body = RecipeCreate,
    responses(
        (status = 201, description = "Recipe created", body = RecipeResponse),
        (status = 400, description = "Invalid input, or tags/ingredients not owned by the caller"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(request): ValidJson<RecipeCreate>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    check_owned_links(
        &mut conn,
        current_user.id,
        request.tags.as_deref(),
        request.ingredients.as_deref(),
    )
    .await?;

    let recipe = Recipes::new(&mut conn, current_user.id)
        .create(&request.into_create_request())
        .await?;

    tracing::info!(recipe_id = recipe.id, "Created recipe");
    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::from_db(recipe, &state.config.media.url)),
    ))
}

/// Get one of the caller's recipes, with tags and ingredients expanded
#[utoipa::path(
    get,
    path = "/recipe/recipes/{id}/",
    tag = "recipe",
    summary = "Get recipe",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe detail", body = RecipeDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id, recipe_id = id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<Json<RecipeDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let recipe = Recipes::new(&mut conn, current_user.id)
        .get_by_id(id)
        .await?
        .ok_or_else(|| recipe_not_found(id))?;

    Ok(Json(RecipeDetailResponse::from_db(recipe, &state.config.media.url)))
}

async fn apply_recipe_update(
    state: &AppState,
    current_user: &CurrentUser,
    id: RecipeId,
    update: RecipeUpdateDBRequest,
) -> Result<Json<RecipeResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    check_owned_links(&mut conn, current_user.id, update.tags.as_deref(), update.ingredients.as_deref()).await?;

    let recipe = Recipes::new(&mut conn, current_user.id).update(id, &update).await?;
    Ok(Json(RecipeResponse::from_db(recipe, &state.config.media.url)))
}

/// Replace one of the caller's recipes. Omitted tags or ingredients are cleared.
#[utoipa::path(
    put,
    path = "/recipe/recipes/{id}/",
    tag = "recipe",
    summary = "Replace recipe",
    request_body = RecipeCreate,
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Updated recipe", body = RecipeResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id, recipe_id = id))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
    ValidJson(request): ValidJson<RecipeCreate>,
) -> Result<Json<RecipeResponse>> {
    apply_recipe_update(&state, &current_user, id, request.into_replace_request()).await
}

/// Update some fields of one of the caller's recipes
#[utoipa::path(
    patch,
    path = "/recipe/recipes/{id}/",
    tag = "recipe",
    summary = "Update recipe",
    request_body = RecipeUpdate,
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Updated recipe", body = RecipeResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id, recipe_id = id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
    ValidJson(request): ValidJson<RecipeUpdate>,
) -> Result<Json<RecipeResponse>> {
    apply_recipe_update(&state, &current_user, id, request.into()).await
}

/// Delete one of the caller's recipes and its image
#[utoipa::path(
    delete,
    path = "/recipe/recipes/{id}/",
    tag = "recipe",
    summary = "Delete recipe",
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipe not found"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id, recipe_id = id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Recipes::new(&mut conn, current_user.id);

    let recipe = repo.get_by_id(id).await?.ok_or_else(|| recipe_not_found(id))?;
    if !repo.delete(id).await? {
        return Err(recipe_not_found(id));
    }

    if let Some(image) = recipe.image.as_deref()
        && let Err(e) = media::remove(&state.config.media.root, image).await
    {
        tracing::warn!("Recipe {} deleted but its image was not removed: {}", id, e);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Upload an image for one of the caller's recipes, replacing any previous one
#[utoipa::path(
    post,
    path = "/recipe/recipes/{id}/upload-image/",
    tag = "recipe",
    summary = "Upload recipe image",
    request_body(content = RecipeImageUpload, content_type = "multipart/form-data"),
    params(("id" = i64, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Image stored", body = RecipeImageResponse),
        (status = 400, description = "Missing file or not an image"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Recipe not found"),
        (status = 413, description = "Payload too large"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.id, recipe_id = id))]
pub async fn upload_image(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RecipeId>,
    mut multipart: Multipart,
) -> Result<Json<RecipeImageResponse>> {
    let max_size = state.config.media.max_upload_size;

    // The connection goes back to the pool before the body is read
    let previous = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Recipes::new(&mut conn, current_user.id)
            .get_by_id(id)
            .await?
            .ok_or_else(|| recipe_not_found(id))?
            .image
    };

    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart data", max_size))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let Some(extension) = field.file_name().and_then(media::image_extension) else {
            return Err(FieldErrors::single(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            )
            .into());
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file chunk", max_size))?
        {
            if bytes.len() + chunk.len() > max_size {
                tracing::warn!(max_size, "Image upload exceeds size limit, aborting");
                return Err(Error::PayloadTooLarge {
                    message: format!("File size exceeds maximum allowed size of {max_size} bytes"),
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(FieldErrors::single("image", "The submitted file is empty.").into());
        }
        upload = Some((extension, bytes));
    }

    let Some((extension, bytes)) = upload else {
        return Err(FieldErrors::single("image", "No file was submitted.").into());
    };

    let path = media::recipe_image_path(&extension);
    media::save(&state.config.media.root, &path, &bytes).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let recipe = match Recipes::new(&mut conn, current_user.id).set_image(id, &path).await {
        Ok(recipe) => recipe,
        Err(e) => {
            // Don't leave an orphaned file behind
            if let Err(remove_err) = media::remove(&state.config.media.root, &path).await {
                tracing::warn!("Stored image {} for recipe {} was not removed: {}", path, id, remove_err);
            }
            return Err(e.into());
        }
    };
    drop(conn);

    if let Some(previous) = previous.as_deref()
        && let Err(e) = media::remove(&state.config.media.root, previous).await
    {
        tracing::warn!("Previous image for recipe {} was not removed: {}", id, e);
    }

    tracing::info!(recipe_id = id, path = %path, size = bytes.len(), "Stored recipe image");
    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image: image_url(&state.config.media.url, recipe.image.as_deref()),
    }))
}
