use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::{
        users::{CurrentUser, TokenRequest, TokenResponse, UserCreate, UserResponse, UserUpdate},
        validation::{FieldErrors, NON_FIELD_ERRORS, ValidJson},
    },
    auth::password,
    db::{
        handlers::{Repository, Tokens, Users},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Unable to authenticate with provided credentials";

/// Register a new user
#[utoipa::path(
    post,
    path = "/user/create/",
    tag = "user",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    // Validation guarantees all three are present
    let (Some(email), Some(password), Some(name)) = (request.email, request.password, request.name) else {
        return Err(Error::BadRequest {
            message: "email, password and name are required".to_string(),
        });
    };

    let password_hash = password::hash_password(&password, state.config.auth.password.argon2_params()).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).create_user(&email, &name, Some(password_hash)).await?;

    tracing::info!(user_id = user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange email and password for an API token
#[utoipa::path(
    post,
    path = "/user/token/",
    tag = "user",
    summary = "Create token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "The user's token", body = TokenResponse),
        (status = 400, description = "Missing fields or invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_token(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let invalid_credentials = || Error::Validation(FieldErrors::single(NON_FIELD_ERRORS, INVALID_CREDENTIALS_MESSAGE));
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(invalid_credentials());
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let Some(user) = Users::new(&mut conn).get_user_by_email(&email).await? else {
        return Err(invalid_credentials());
    };

    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(invalid_credentials());
    };
    if !password::verify_password(&password, password_hash).await? || !user.is_active {
        return Err(invalid_credentials());
    }

    let token = Tokens::new(&mut conn).get_or_create_for_user(user.id).await?;
    Ok(Json(TokenResponse { token }))
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/user/me/",
    tag = "user",
    summary = "Get current user",
    responses(
        (status = 200, description = "Current user's profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(current_user: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        email: current_user.email,
        name: current_user.name,
    })
}

/// Replace the authenticated user's profile. Every field is required.
#[utoipa::path(
    put,
    path = "/user/me/",
    tag = "user",
    summary = "Replace current user",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn replace_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(request): ValidJson<UserUpdate>,
) -> Result<Json<UserResponse>> {
    request.validate_full(&state.config)?;
    apply_profile_update(&state, current_user, request).await
}

/// Update some fields of the authenticated user's profile
#[utoipa::path(
    patch,
    path = "/user/me/",
    tag = "user",
    summary = "Update current user",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(request): ValidJson<UserUpdate>,
) -> Result<Json<UserResponse>> {
    apply_profile_update(&state, current_user, request).await
}

async fn apply_profile_update(state: &AppState, current_user: CurrentUser, request: UserUpdate) -> Result<Json<UserResponse>> {
    let password_hash = match request.password.as_deref() {
        Some(password) => Some(password::hash_password(password, state.config.auth.password.argon2_params()).await?),
        None => None,
    };

    let update = UserUpdateDBRequest {
        email: request.email,
        name: request.name,
        password_hash,
        ..Default::default()
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).update(current_user.id, &update).await?;
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::{TokenResponse, UserResponse},
        auth::password::verify_string,
        db::handlers::{Tokens, Users},
        test_utils::{create_test_app, create_test_token, create_test_user, token_header},
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    const CREATE_USER_URL: &str = "/api/user/create/";
    const TOKEN_URL: &str = "/api/user/token/";
    const ME_URL: &str = "/api/user/me/";

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_valid_user_success(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let payload = json!({
            "email": "test@londonappdev.com",
            "password": "testpass",
            "name": "Test name",
        });

        let response = server.post(CREATE_USER_URL).json(&payload).await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body, json!({"email": "test@londonappdev.com", "name": "Test name"}));
        assert!(body.get("password").is_none());

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .get_user_by_email("test@londonappdev.com")
            .await
            .unwrap()
            .unwrap();
        assert!(verify_string("testpass", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_exists(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        create_test_user(&pool, "test@londonappdev.com", "testpass").await;

        let response = server
            .post(CREATE_USER_URL)
            .json(&json!({"email": "test@londonappdev.com", "password": "testpass", "name": "Test"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body.get("email").is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_password_too_short(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post(CREATE_USER_URL)
            .json(&json!({"email": "test@londonappdev.com", "password": "pw", "name": "Test"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email("test@londonappdev.com").await.unwrap();
        assert!(user.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user_reports_every_missing_field(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.post(CREATE_USER_URL).json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        for field in ["email", "password", "name"] {
            assert_eq!(body[field], json!(["This field is required."]));
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_token_for_user(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        create_test_user(&pool, "test@londonappdev.com", "testpass").await;

        let response = server
            .post(TOKEN_URL)
            .json(&json!({"email": "test@londonappdev.com", "password": "testpass"}))
            .await;
        response.assert_status_ok();
        let first: TokenResponse = response.json();
        assert!(!first.token.is_empty());

        // Same token every time
        let response = server
            .post(TOKEN_URL)
            .json(&json!({"email": "TEST@londonappdev.com", "password": "testpass"}))
            .await;
        response.assert_status_ok();
        let second: TokenResponse = response.json();
        assert_eq!(first.token, second.token);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_token_invalid_credentials(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;

        let response = server
            .post(TOKEN_URL)
            .json(&json!({"email": "test@londonappdev.com", "password": "wrong"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(
            body,
            json!({"non_field_errors": ["Unable to authenticate with provided credentials"]})
        );

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Tokens::new(&mut conn).count_for_user(user.id).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_token_no_user(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server
            .post(TOKEN_URL)
            .json(&json!({"email": "test@londonappdev.com", "password": "testpass"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body.get("token").is_none());
        assert!(body.get("non_field_errors").is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_token_missing_field(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.post(TOKEN_URL).json(&json!({"email": "one", "password": ""})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body.get("password").is_some());
        assert!(body.get("token").is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_retrieve_user_unauthorized(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get(ME_URL).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_retrieve_profile_success(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        let (name, value) = token_header(&token);

        let response = server.get(ME_URL).add_header(name, value).await;
        response.assert_status_ok();
        let body: UserResponse = response.json();
        assert_eq!(body.email, user.email);
        assert_eq!(body.name, user.name);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_post_me_not_allowed(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        let (name, value) = token_header(&token);

        let response = server.post(ME_URL).add_header(name, value).json(&json!({})).await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_user_profile(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        let (name, value) = token_header(&token);

        let response = server
            .patch(ME_URL)
            .add_header(name, value)
            .json(&json!({"name": "new name", "password": "newpassword123"}))
            .await;
        response.assert_status_ok();

        let mut conn = pool.acquire().await.unwrap();
        let updated = Users::new(&mut conn)
            .get_user_by_email("test@londonappdev.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "new name");
        assert!(verify_string("newpassword123", updated.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_put_requires_every_field(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, "test@londonappdev.com", "testpass").await;
        let token = create_test_token(&pool, user.id).await;
        let (name, value) = token_header(&token);

        let response = server
            .put(ME_URL)
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "new name"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body.get("email").is_some());
        assert!(body.get("password").is_some());

        let response = server
            .put(ME_URL)
            .add_header(name, value)
            .json(&json!({"email": "new@londonappdev.com", "password": "newpass", "name": "new name"}))
            .await;
        response.assert_status_ok();
        let body: UserResponse = response.json();
        assert_eq!(body.email, "new@londonappdev.com");
    }
}
