//! Test utilities: configuration, servers and fixtures.

use crate::{
    AppState, Application,
    auth::password::{self, Argon2Params},
    config::Config,
    db::{
        handlers::{Attributes, Recipes, Repository, Tokens, Users},
        models::{
            attributes::AttributeDBResponse,
            recipes::{RecipeCreateDBRequest, RecipeDBResponse},
            users::UserDBResponse,
        },
    },
    types::UserId,
};
use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Cheap hashing so tests don't spend their time in Argon2
const TEST_ARGON2_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 128,
    iterations: 1,
    parallelism: 1,
};

pub fn create_test_config() -> Config {
    let media_root = std::env::temp_dir().join(format!("recipe-api-test-media-{}", std::process::id()));

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        enable_metrics: false,
        ..Default::default()
    };
    config.auth.password.argon2_memory_kib = TEST_ARGON2_PARAMS.memory_kib;
    config.auth.password.argon2_iterations = TEST_ARGON2_PARAMS.iterations;
    config.auth.password.argon2_parallelism = TEST_ARGON2_PARAMS.parallelism;
    config.auth.session.cookie_secure = false;
    config.media.root = media_root;
    config
}

pub fn create_test_state(pool: PgPool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

async fn insert_user(pool: &PgPool, email: &str, password: &str, superuser: bool) -> UserDBResponse {
    let hash = password::hash_string_with_params(password, Some(TEST_ARGON2_PARAMS)).expect("Failed to hash password");
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users = Users::new(&mut conn);
    if superuser {
        users.create_superuser(email, Some(hash)).await
    } else {
        users.create_user(email, "Test name", Some(hash)).await
    }
    .expect("Failed to create test user")
}

/// An active, regular user named "Test name"
pub async fn create_test_user(pool: &PgPool, email: &str, password: &str) -> UserDBResponse {
    insert_user(pool, email, password, false).await
}

pub async fn create_test_superuser(pool: &PgPool, email: &str, password: &str) -> UserDBResponse {
    insert_user(pool, email, password, true).await
}

pub async fn create_test_token(pool: &PgPool, user_id: UserId) -> String {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Tokens::new(&mut conn)
        .get_or_create_for_user(user_id)
        .await
        .expect("Failed to create token")
}

/// `Authorization: Token <key>`
pub fn token_header(token: &str) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&format!("Token {token}")).expect("Invalid token header");
    (AUTHORIZATION, value)
}

pub async fn create_test_tag(pool: &PgPool, owner: UserId, name: &str) -> AttributeDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Attributes::tags(&mut conn, owner)
        .create(name)
        .await
        .expect("Failed to create tag")
}

pub async fn create_test_ingredient(pool: &PgPool, owner: UserId, name: &str) -> AttributeDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Attributes::ingredients(&mut conn, owner)
        .create(name)
        .await
        .expect("Failed to create ingredient")
}

/// A recipe taking 10 minutes and costing 5.00, with no tags or ingredients
pub async fn create_test_recipe(pool: &PgPool, owner: UserId, title: &str) -> RecipeDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Recipes::new(&mut conn, owner)
        .create(&RecipeCreateDBRequest {
            title: title.to_string(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            link: String::new(),
            tags: vec![],
            ingredients: vec![],
        })
        .await
        .expect("Failed to create recipe")
}
