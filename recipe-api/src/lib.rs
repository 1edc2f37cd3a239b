//! # recipe-api: multi-tenant recipe service
//!
//! A REST API for managing recipes, with the tags and ingredients that classify them. Every
//! record belongs to the user who created it and is invisible to everyone else.
//!
//! ## Surfaces
//!
//! - **REST API** (`/api/...`): registration, token exchange, the caller's profile, and
//!   owner-scoped CRUD on tags, ingredients and recipes. Clients authenticate with
//!   `Authorization: Token <key>`.
//! - **Admin site** (`/admin/...`): server-rendered pages for staff, authenticated by a signed
//!   session cookie.
//! - **Media** (`media.url`, default `/media/`): uploaded recipe images served from `media.root`.
//! - **Docs**: OpenAPI document at `/api/openapi.json`, browsable at `/api/docs`.
//!
//! ## Modules
//!
//! - [`api`]: HTTP handlers and request/response models
//! - [`auth`]: token and session authentication, password hashing
//! - [`db`]: owner-scoped repositories over PostgreSQL
//! - [`admin`]: the admin site
//! - [`media`]: image storage
//! - [`config`]: YAML and environment configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use recipe_api::{Application, Config, telemetry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = recipe_api::config::Args { config: "config.yaml".into(), validate: false };
//!     let config = Config::load(&args)?;
//!     telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async { tokio::signal::ctrl_c().await.unwrap() }).await
//! }
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
mod crypto;
pub mod db;
pub mod errors;
pub mod media;
pub mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

use crate::{
    auth::password::{self, Argon2Params},
    config::CorsOrigin,
    db::{
        handlers::{Repository, Users},
        models::users::UserUpdateDBRequest,
    },
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use types::UserId;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Multipart framing allowance on top of `media.max_upload_size`
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Database migrator for the schema under `./migrations`
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Ensure a superuser with this email exists and has this password.
///
/// Idempotent: an existing account gets the password and the active, staff and superuser flags;
/// otherwise a superuser is created.
#[instrument(skip(password, params, db), err)]
pub async fn create_initial_admin_user(
    email: &str,
    password: &str,
    params: Argon2Params,
    db: &PgPool,
) -> anyhow::Result<UserId> {
    let password_hash = password::hash_password(password, params).await?;

    let mut tx = db.begin().await?;
    let mut users = Users::new(&mut tx);

    let id = match users.get_user_by_email(email).await? {
        Some(existing) => {
            let request = UserUpdateDBRequest {
                password_hash: Some(password_hash),
                is_active: Some(true),
                is_staff: Some(true),
                is_superuser: Some(true),
                ..Default::default()
            };
            users.update(existing.id, &request).await?.id
        }
        None => users.create_superuser(email, Some(password_hash)).await?.id,
    };

    tx.commit().await?;
    Ok(id)
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let wildcard = cors_config
        .allowed_origins
        .iter()
        .any(|origin| matches!(origin, CorsOrigin::Wildcard));

    let mut cors = if wildcard {
        // Browsers refuse credentials with a wildcard origin
        CorsLayer::new().allow_origin(AllowOrigin::any())
    } else {
        let origins = cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin {
                CorsOrigin::Url(url) => Some(url.origin().ascii_serialization()),
                CorsOrigin::Wildcard => None,
            })
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(cors_config.allow_credentials)
    };

    cors = cors
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .expose_headers([http::header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Routes under `/api`
fn api_routes(config: &Config) -> Router<AppState> {
    use api::handlers::{attributes, recipes, users};

    let upload_limit = config.media.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/user/create/", post(users::create_user))
        .route("/api/user/token/", post(users::create_token))
        .route(
            "/api/user/me/",
            get(users::get_me).put(users::replace_me).patch(users::update_me),
        )
        .route(
            "/api/recipe/tags/",
            get(attributes::list_tags).post(attributes::create_tag),
        )
        .route(
            "/api/recipe/ingredients/",
            get(attributes::list_ingredients).post(attributes::create_ingredient),
        )
        .route(
            "/api/recipe/recipes/",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipe/recipes/{id}/",
            get(recipes::get_recipe)
                .put(recipes::replace_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/api/recipe/recipes/{id}/upload-image/",
            post(recipes::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

/// Build the application router with all endpoints and middleware.
///
/// - `/healthz` liveness check
/// - REST API, its OpenAPI document and the Scalar reference at `/api/docs`
/// - Admin site
/// - Uploaded media from `media.root`
/// - Prometheus metrics at `/internal/metrics` when `enable_metrics` is set
/// - CORS and request tracing
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let media_prefix = state.config.media.url.trim_end_matches('/').to_string();
    let cors = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(api_routes(&state.config))
        .merge(admin::router())
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .nest_service(&media_prefix, ServeDir::new(&state.config.media.root))
        .with_state(state)
        .layer(cors);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service: a migrated pool, application state and router
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Connect to `database.url` and initialize the application
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting recipe-api with configuration: {:#?}", config);

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(config.database.acquire_timeout)
            .connect(&config.database.url)
            .await?;

        Self::new_with_pool(config, pool).await
    }

    /// Initialize against an existing pool: run migrations, ensure the configured superuser,
    /// create the media root and build the router.
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
            let id = create_initial_admin_user(email, password, config.auth.password.argon2_params(), &pool).await?;
            info!(user_id = id, "Ensured initial superuser");
        }

        tokio::fs::create_dir_all(&config.media.root).await?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Serve until `shutdown` resolves, then close the pool and flush telemetry
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "recipe-api listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
