//! Server-rendered admin site under `/admin/`.
//!
//! Staff log in with email and password and receive a signed session cookie (see
//! [`crate::auth::session`]). Every page except the login form requires an active staff account:
//! browsers without a session are redirected to the login form, and authenticated users without
//! the staff flag get 403.
//!
//! Users can be listed, added, edited and deleted; changing users requires the superuser flag.
//! Tags, ingredients and recipes are shown read-only across all owners.

mod render;
pub mod views;

use crate::{AppState, api::models::users::CurrentUser, auth::current_user::try_session_auth, errors::Error};
use axum::{
    Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::context;
use tracing::{instrument, trace};

pub(crate) use render::render;

pub const LOGIN_PATH: &str = "/admin/login/";
pub const INDEX_PATH: &str = "/admin/";

/// Only same-site admin paths are accepted as a post-login destination
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with(INDEX_PATH) && !next.starts_with("//") => next,
        _ => INDEX_PATH,
    }
}

fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}

/// An active staff user authenticated through the admin session cookie
#[derive(Debug, Clone)]
pub struct StaffUser(pub CurrentUser);

#[derive(Debug)]
pub enum AdminRejection {
    /// No usable session: send the browser to the login form
    Login { next: String },
    /// Authenticated, but not staff
    Forbidden(CurrentUser),
    Error(Error),
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::Login { next } => Redirect::to(&login_url(&next)).into_response(),
            AdminRejection::Forbidden(user) => {
                match render("forbidden.html", context! { title => "Permission denied", user => user }) {
                    Ok(html) => (StatusCode::FORBIDDEN, html).into_response(),
                    Err(e) => e.into_response(),
                }
            }
            AdminRejection::Error(e) => e.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AdminRejection;

    #[instrument(skip_all, fields(path = %parts.uri.path()))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| INDEX_PATH.to_string());

        match try_session_auth(parts, state).await {
            Some(Ok(user)) if user.is_staff => Ok(StaffUser(user)),
            Some(Ok(user)) => {
                trace!("User {} is not staff", user.id);
                Err(AdminRejection::Forbidden(user))
            }
            Some(Err(Error::Unauthenticated { .. })) | None => Err(AdminRejection::Login { next }),
            Some(Err(e)) => Err(AdminRejection::Error(e)),
        }
    }
}

/// Routes of the admin site, with full paths
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(|| async { Redirect::permanent(INDEX_PATH) }))
        .route(INDEX_PATH, get(views::index))
        .route(LOGIN_PATH, get(views::login_page).post(views::login))
        .route("/admin/logout/", post(views::logout))
        .route("/admin/users/", get(views::user_changelist))
        .route("/admin/users/add/", get(views::user_add_page).post(views::user_add))
        .route(
            "/admin/users/{id}/change/",
            get(views::user_change_page).post(views::user_change),
        )
        .route("/admin/users/{id}/delete/", post(views::user_delete))
        .route("/admin/tags/", get(views::tag_changelist))
        .route("/admin/ingredients/", get(views::ingredient_changelist))
        .route("/admin/recipes/", get(views::recipe_changelist))
}
