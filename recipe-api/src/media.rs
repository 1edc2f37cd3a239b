//! Storage of uploaded recipe images under `media.root`.
//!
//! Stored paths are relative to the media root and are what the database keeps; the public URL
//! is `media.url` followed by the path.

use crate::errors::{Error, Result};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Directory, relative to the media root, holding recipe images
pub const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";

/// Lowercased extension of `filename` if it names an image type
pub fn image_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    let mime = mime_guess::from_ext(&extension).first()?;
    (mime.type_() == mime_guess::mime::IMAGE).then_some(extension)
}

/// Fresh relative path for a recipe image: `uploads/recipe/<uuid>.<ext>`
pub fn recipe_image_path(extension: &str) -> String {
    format!("{RECIPE_UPLOAD_DIR}/{}.{extension}", Uuid::new_v4())
}

/// Resolve a stored relative path against the media root, refusing anything that escapes it
fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(Error::Internal {
            operation: format!("resolve media path {}", relative.display()),
        });
    }
    Ok(root.join(relative))
}

/// Write `bytes` to `relative` under the media root, creating directories as needed
#[tracing::instrument(skip(root, bytes), fields(size = bytes.len()), err)]
pub async fn save(root: &Path, relative: &str, bytes: &[u8]) -> Result<()> {
    let path = resolve(root, relative)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| Error::Internal {
            operation: format!("create media directory {}: {e}", parent.display()),
        })?;
    }
    tokio::fs::write(&path, bytes).await.map_err(|e| Error::Internal {
        operation: format!("write media file {}: {e}", path.display()),
    })
}

/// Remove a previously stored file. A file that is already gone is not an error.
#[tracing::instrument(skip(root), err)]
pub async fn remove(root: &Path, relative: &str) -> Result<()> {
    let path = resolve(root, relative)?;
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Internal {
            operation: format!("remove media file {}: {e}", path.display()),
        }),
    }
}
