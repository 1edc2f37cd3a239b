//! Admin page handlers.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Redirect, Response},
};
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{AdminRejection, LOGIN_PATH, StaffUser, render, safe_next};
use crate::{
    AppState,
    api::models::{
        users::CurrentUser,
        validation::{FieldErrors, MAX_TEXT_LENGTH, check_email, check_password, check_text},
    },
    auth::{password, session},
    db::{
        handlers::{Catalog, Repository, Users, users::UserFilter},
        models::{
            attributes::AttributeKind,
            users::{UserDBResponse, UserUpdateDBRequest},
        },
    },
    errors::{DUPLICATE_EMAIL_MESSAGE, Error, Result},
    types::UserId,
};

pub const INVALID_LOGIN_MESSAGE: &str =
    "Please enter the correct email and password for a staff account. Note that both fields may be case-sensitive.";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "The two password fields didn't match.";

const USERS_PATH: &str = "/admin/users/";

fn user_change_path(id: UserId) -> String {
    format!("/admin/users/{id}/change/")
}

fn require_superuser(user: &CurrentUser) -> Result<()> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            resource: "user administration".to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    email: String,
    password: String,
    next: Option<String>,
}

fn render_login(email: &str, next: &str, error: Option<&str>) -> Result<Html<String>> {
    render(
        "login.html",
        context! { title => "Log in", email => email, next => next, error => error },
    )
}

#[instrument(skip_all)]
pub async fn login_page(
    staff: std::result::Result<StaffUser, AdminRejection>,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    let next = safe_next(query.next.as_deref());

    // Already logged in as staff: skip the form
    if staff.is_ok() {
        return Ok(Redirect::to(next).into_response());
    }

    Ok(render_login("", next, None)?.into_response())
}

#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response> {
    let next = safe_next(form.next.as_deref());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_user_by_email(&form.email).await?;
    drop(conn);

    let mut authenticated = None;
    if let Some(user) = user
        && user.is_active
        && user.is_staff
        && let Some(hash) = user.password_hash.as_deref()
        && password::verify_password(&form.password, hash).await?
    {
        authenticated = Some(CurrentUser::from(user));
    }

    let Some(user) = authenticated else {
        info!("Rejected admin login");
        return Ok(render_login(&form.email, next, Some(INVALID_LOGIN_MESSAGE))?.into_response());
    };

    let token = session::create_session_token(&user, &state.config)?;
    let cookie = session::create_session_cookie(&token, &state.config);

    info!(user_id = user.id, "Admin login");
    Ok(([(SET_COOKIE, cookie)], Redirect::to(next)).into_response())
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session::clear_session_cookie(&state.config);
    ([(SET_COOKIE, cookie)], Redirect::to(LOGIN_PATH)).into_response()
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn index(State(state): State<AppState>, StaffUser(user): StaffUser) -> Result<Html<String>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let counts = Catalog::new(&mut conn).counts().await?;

    render(
        "index.html",
        context! { title => "Site administration", user => user, counts => counts },
    )
}

/// A user as shown in the admin. Never carries the password hash.
#[derive(Debug, Serialize)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    updated_at: String,
}

impl From<UserDBResponse> for UserRow {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            name: db.name,
            is_active: db.is_active,
            is_staff: db.is_staff,
            is_superuser: db.is_superuser,
            updated_at: db.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Users shown per changelist page
pub const USERS_PER_PAGE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ChangelistQuery {
    deleted: Option<String>,
    skip: Option<i64>,
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn user_changelist(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Query(query): Query<ChangelistQuery>,
) -> Result<Html<String>> {
    let skip = query.skip.unwrap_or(0).max(0);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let total = repo.count().await?;
    let users: Vec<UserRow> = repo
        .list(&UserFilter::new(skip, USERS_PER_PAGE))
        .await?
        .into_iter()
        .map(UserRow::from)
        .collect();

    let first = if users.is_empty() { skip } else { skip + 1 };
    let last = skip + users.len() as i64;
    let previous = (skip > 0).then(|| (skip - USERS_PER_PAGE).max(0));
    let next = (last < total).then_some(last);

    let message = query.deleted.map(|email| format!("The user \"{email}\" was deleted successfully."));
    render(
        "user_changelist.html",
        context! {
            title => "Users",
            user => user,
            users => users,
            message => message,
            first => first,
            last => last,
            total => total,
            previous => previous,
            next => next,
        },
    )
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAddForm {
    email: String,
    name: String,
    #[serde(skip_serializing)]
    password1: String,
    #[serde(skip_serializing)]
    password2: String,
}

impl UserAddForm {
    fn validate(&self, config: &crate::config::Config) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "email", &self.email);
        check_text(&mut errors, "name", &self.name, MAX_TEXT_LENGTH);
        check_password(&mut errors, "password1", &self.password1, config);
        if self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH_MESSAGE);
        }
        errors
    }
}

fn render_user_add(user: &CurrentUser, form: &UserAddForm, errors: &FieldErrors) -> Result<Html<String>> {
    render(
        "user_add.html",
        context! { title => "Add user", user => user, form => form, errors => errors },
    )
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn user_add_page(StaffUser(user): StaffUser) -> Result<Html<String>> {
    require_superuser(&user)?;
    render_user_add(&user, &UserAddForm::default(), &FieldErrors::new())
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn user_add(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Form(form): Form<UserAddForm>,
) -> Result<Response> {
    require_superuser(&user)?;

    let mut errors = form.validate(&state.config);
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if errors.get("email").is_none() && Users::new(&mut conn).get_user_by_email(&form.email).await?.is_some() {
        errors.add("email", DUPLICATE_EMAIL_MESSAGE);
    }
    if !errors.is_empty() {
        return Ok(render_user_add(&user, &form, &errors)?.into_response());
    }

    let password_hash = password::hash_password(&form.password1, state.config.auth.password.argon2_params()).await?;
    let created = Users::new(&mut conn)
        .create_user(&form.email, form.name.trim(), Some(password_hash))
        .await?;

    info!(created_id = created.id, "Admin created user");
    Ok(Redirect::to(&user_change_path(created.id)).into_response())
}

async fn load_user(state: &AppState, id: UserId) -> Result<UserDBResponse> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    })
}

fn render_user_change(user: &CurrentUser, target: UserRow, errors: &FieldErrors) -> Result<Html<String>> {
    let title = format!("Change user {}", target.email);
    render(
        "user_change.html",
        context! { title => title, user => user, target => target, errors => errors },
    )
}

#[instrument(skip_all, fields(user_id = user.id, target_id = id))]
pub async fn user_change_page(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<UserId>,
) -> Result<Html<String>> {
    require_superuser(&user)?;
    let target = load_user(&state, id).await?;
    render_user_change(&user, UserRow::from(target), &FieldErrors::new())
}

/// Unchecked checkboxes are absent from the submitted form
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserChangeForm {
    name: String,
    is_active: Option<String>,
    is_staff: Option<String>,
    is_superuser: Option<String>,
}

#[instrument(skip_all, fields(user_id = user.id, target_id = id))]
pub async fn user_change(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<UserId>,
    Form(form): Form<UserChangeForm>,
) -> Result<Response> {
    require_superuser(&user)?;
    let target = load_user(&state, id).await?;

    let mut errors = FieldErrors::new();
    check_text(&mut errors, "name", &form.name, MAX_TEXT_LENGTH);
    if !errors.is_empty() {
        let mut row = UserRow::from(target);
        row.name = form.name;
        return Ok(render_user_change(&user, row, &errors)?.into_response());
    }

    let request = UserUpdateDBRequest {
        name: Some(form.name.trim().to_string()),
        is_active: Some(form.is_active.is_some()),
        is_staff: Some(form.is_staff.is_some()),
        is_superuser: Some(form.is_superuser.is_some()),
        ..Default::default()
    };
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).update(target.id, &request).await?;

    info!("Admin changed user");
    Ok(Redirect::to(USERS_PATH).into_response())
}

#[instrument(skip_all, fields(user_id = user.id, target_id = id))]
pub async fn user_delete(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<UserId>,
) -> Result<Response> {
    require_superuser(&user)?;
    if id == user.id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account from the admin site.".to_string(),
        });
    }

    let target = load_user(&state, id).await?;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).delete(target.id).await?;

    info!("Admin deleted user");
    let encoded: String = url::form_urlencoded::byte_serialize(target.email.as_bytes()).collect();
    Ok(Redirect::to(&format!("{USERS_PATH}?deleted={encoded}")).into_response())
}

async fn attribute_changelist(state: &AppState, user: CurrentUser, kind: AttributeKind, title: &str) -> Result<Html<String>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows: Vec<Vec<String>> = Catalog::new(&mut conn)
        .list_attributes(kind)
        .await?
        .into_iter()
        .map(|a| vec![a.id.to_string(), a.name, a.owner_email])
        .collect();

    render(
        "catalog.html",
        context! { title => title, user => user, columns => ["ID", "Name", "Owner"], rows => rows },
    )
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn tag_changelist(State(state): State<AppState>, StaffUser(user): StaffUser) -> Result<Html<String>> {
    attribute_changelist(&state, user, AttributeKind::Tag, "Tags").await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn ingredient_changelist(State(state): State<AppState>, StaffUser(user): StaffUser) -> Result<Html<String>> {
    attribute_changelist(&state, user, AttributeKind::Ingredient, "Ingredients").await
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn recipe_changelist(State(state): State<AppState>, StaffUser(user): StaffUser) -> Result<Html<String>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rows: Vec<Vec<String>> = Catalog::new(&mut conn)
        .list_recipes()
        .await?
        .into_iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.title,
                r.time_minutes.to_string(),
                r.price.to_string(),
                r.owner_email,
            ]
        })
        .collect();

    render(
        "catalog.html",
        context! {
            title => "Recipes",
            user => user,
            columns => ["ID", "Title", "Time (minutes)", "Price", "Owner"],
            rows => rows,
        },
    )
}
