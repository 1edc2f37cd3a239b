use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    db::handlers::{Repository, Tokens, Users},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sqlx::PgPool;
use tracing::{debug, instrument, trace};

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token.";
pub const INACTIVE_USER_MESSAGE: &str = "User inactive or deleted.";

/// Pull the key out of `Authorization: Token <key>` (or `Bearer <key>`)
fn authorization_key(parts: &Parts) -> Option<Result<&str>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let (scheme, key) = auth_str.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        // Some other scheme, not ours to reject
        return None;
    }

    let key = key.trim();
    if key.is_empty() || key.contains(' ') {
        return Some(Err(Error::Unauthenticated {
            message: Some(INVALID_TOKEN_MESSAGE.to_string()),
        }));
    }
    Some(Ok(key))
}

/// Extract user from an API token in the Authorization header
/// Returns:
/// - None: No Authorization header, or a scheme other than Token/Bearer
/// - Some(Ok(user)): Token found and its user is active
/// - Some(Err(error)): Token present but unknown, or its user is inactive
#[instrument(skip(parts, db))]
async fn try_token_auth(parts: &Parts, db: &PgPool) -> Option<Result<CurrentUser>> {
    let key = match authorization_key(parts)? {
        Ok(key) => key,
        Err(e) => return Some(Err(e)),
    };

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(Error::Database(e.into()))),
    };

    let user = match Tokens::new(&mut conn).get_user_by_key(key).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Some(Err(Error::Unauthenticated {
                message: Some(INVALID_TOKEN_MESSAGE.to_string()),
            }));
        }
        Err(e) => return Some(Err(e.into())),
    };

    if !user.is_active {
        return Some(Err(Error::Unauthenticated {
            message: Some(INACTIVE_USER_MESSAGE.to_string()),
        }));
    }

    Some(Ok(CurrentUser::from(user)))
}

/// Value of the session cookie, if the request carries one
fn session_cookie<'a>(parts: &'a Parts, config: &Config) -> Option<&'a str> {
    let cookie_str = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    let cookie_name = &config.auth.session.cookie_name;

    cookie_str.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        (name == cookie_name).then_some(value)
    })
}

/// Extract user from the admin session cookie if present and valid
/// Returns:
/// - None: No session cookie, or one that is expired or badly signed
/// - Some(Ok(user)): Valid session for an active user
/// - Some(Err(error)): Valid session, but the account is gone or deactivated
#[instrument(skip_all)]
pub(crate) async fn try_session_auth(parts: &Parts, state: &AppState) -> Option<Result<CurrentUser>> {
    let token = session_cookie(parts, &state.config)?;

    // Expired sessions are expected; treat them like no session at all
    let claims = match session::verify_session_token(token, &state.config) {
        Ok(claims) => claims,
        Err(e) => {
            trace!("Ignoring invalid session cookie: {:?}", e);
            return None;
        }
    };

    // Reload so that deactivation takes effect before the session expires
    let mut conn = match state.db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(Error::Database(e.into()))),
    };
    match Users::new(&mut conn).get_by_id(claims.sub).await {
        Ok(Some(user)) if user.is_active => Some(Ok(CurrentUser::from(user))),
        Ok(_) => Some(Err(Error::Unauthenticated {
            message: Some(INACTIVE_USER_MESSAGE.to_string()),
        })),
        Err(e) => Some(Err(e.into())),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means credentials were present but invalid
        //
        // The first success wins. Otherwise the first failure is reported.
        let mut auth_errors = Vec::new();

        match try_token_auth(parts, &state.db).await {
            Some(Ok(user)) => {
                debug!("Found token authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Token authentication failed: {:?}", e);
                auth_errors.push(e);
            }
            None => trace!("No token authentication attempted"),
        }

        match try_session_auth(parts, state).await {
            Some(Ok(user)) => {
                debug!("Found session authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => {
                trace!("Session authentication failed: {:?}", e);
                auth_errors.push(e);
            }
            None => trace!("No session authentication attempted"),
        }

        match auth_errors.into_iter().next() {
            Some(e) => Err(e),
            None => {
                trace!("No authentication credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}
