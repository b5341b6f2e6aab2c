//! Fetch-and-persist helper for generated images.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ensure_success;
use crate::error::ImageGenError;

/// Upper bound on a single image download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Download `url` and write the bytes to `path`.
///
/// Missing parent directories are created. Returns `path` on success.
pub async fn download_to(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    timeout: Duration,
) -> Result<PathBuf, ImageGenError> {
    let response = client.get(url).timeout(timeout).send().await?;
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;

    write_file(path, &bytes).await?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Image saved");
    Ok(path.to_path_buf())
}

/// Write `bytes` to `path`, creating parent directories first.
pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ImageGenError> {
    let io_err = |source| ImageGenError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, bytes).await.map_err(io_err)
}
