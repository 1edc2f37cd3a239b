//! Template environment for the admin pages. Templates are compiled into the binary.

use crate::errors::{Error, Result};
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;
use std::sync::LazyLock;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("templates/base.html")),
    ("login.html", include_str!("templates/login.html")),
    ("index.html", include_str!("templates/index.html")),
    ("forbidden.html", include_str!("templates/forbidden.html")),
    ("user_changelist.html", include_str!("templates/user_changelist.html")),
    ("user_add.html", include_str!("templates/user_add.html")),
    ("user_change.html", include_str!("templates/user_change.html")),
    ("catalog.html", include_str!("templates/catalog.html")),
];

static ENVIRONMENT: LazyLock<std::result::Result<Environment<'static>, minijinja::Error>> = LazyLock::new(|| {
    let mut env = Environment::new();
    for &(name, source) in TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
});

/// Render a named template to an HTML response
pub fn render<S: Serialize>(name: &str, context: S) -> Result<Html<String>> {
    let env = ENVIRONMENT.as_ref().map_err(|e| Error::Internal {
        operation: format!("load admin templates: {e}"),
    })?;

    let html = env
        .get_template(name)
        .and_then(|template| template.render(context))
        .map_err(|e| Error::Internal {
            operation: format!("render {name}: {e}"),
        })?;

    Ok(Html(html))
}
