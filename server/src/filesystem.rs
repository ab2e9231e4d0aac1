use crate::config::Config;
use std::path::{Path, PathBuf};

/// Url prefix under which order photos are served.
pub const ORDER_PHOTO_URL: &str = "/uploads/ordenes/";

/// Path an order photo is written to before the database records it.
pub fn temporary_photo_path(config: &Config, file_name: &str) -> PathBuf {
    config.order_photo_dir().join(format!(".{file_name}.tmp"))
}

pub fn photo_url(file_name: &str) -> String {
    format!("{ORDER_PHOTO_URL}{file_name}")
}

/// Maps the url of an order photo back to its location on disk.
/// Returns `None` for urls that don't point into the order photo directory.
pub fn photo_path(config: &Config, url: &str) -> Option<PathBuf> {
    let file_name = url.strip_prefix(ORDER_PHOTO_URL)?;
    let is_plain_name = !file_name.is_empty()
        && !file_name.starts_with('.')
        && !file_name.contains(['/', '\\']);
    is_plain_name.then(|| config.order_photo_dir().join(file_name))
}

/// Moves a written photo from `temp_path` to `path` once `persist` succeeds.
/// The rename happens inside `persist`'s scope, so on failure neither file is left behind.
pub fn commit_photo<T, E, F>(temp_path: &Path, path: &Path, persist: F) -> Result<T, E>
where
    F: FnOnce(&dyn Fn() -> std::io::Result<()>) -> Result<T, E>,
{
    let result = persist(&|| std::fs::rename(temp_path, path));
    if result.is_err() {
        for file in [temp_path, path] {
            if let Err(err) = remove_if_exists(file) {
                tracing::warn!("Failed to remove {} for reason: {err}", file.display());
            }
        }
    }
    result
}

/// Removes the photos at `urls` from disk. Failures are logged, as the
/// records pointing to them are already gone.
pub fn remove_photos<'a>(config: &Config, urls: impl IntoIterator<Item = &'a str>) {
    for path in urls.into_iter().filter_map(|url| photo_path(config, url)) {
        if let Err(err) = remove_if_exists(&path) {
            tracing::warn!("Failed to remove {} for reason: {err}", path.display());
        }
    }
}

/// Removes `file` if it exists.
fn remove_if_exists(file: &Path) -> std::io::Result<()> {
    if let Err(err) = std::fs::remove_file(file)
        && err.kind() != std::io::ErrorKind::NotFound
    {
        Err(err)
    } else {
        Ok(())
    }
}
