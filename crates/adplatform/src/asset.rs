//! Local image asset loading and pre-upload checks.
//!
//! The image is read once into memory and its header is decoded to
//! confirm the format and extract dimensions. Nothing is sent to the
//! platform for files that fail here.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::UploadError;

/// Largest image the ad image library accepts.
pub const MAX_IMAGE_BYTES: u64 = 30 * 1024 * 1024;

/// Image bytes ready for upload.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub path: PathBuf,
    /// File name sent with the multipart upload; the platform keys the
    /// response by it.
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub format: image::ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageAsset {
    /// Read and check the image at `path`.
    pub async fn load(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                UploadError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                UploadError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::from_bytes(path, bytes)
    }

    /// Check in-memory bytes as if they had been read from `path`.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty {
                path: path.to_path_buf(),
            });
        }

        let size = bytes.len() as u64;
        if size > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge {
                path: path.to_path_buf(),
                size,
                max: MAX_IMAGE_BYTES,
            });
        }

        let unsupported = |reason: String| UploadError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason,
        };

        let format = image::guess_format(&bytes).map_err(|e| unsupported(e.to_string()))?;
        if !matches!(
            format,
            image::ImageFormat::Png | image::ImageFormat::Jpeg | image::ImageFormat::WebP
        ) {
            return Err(unsupported(format!("{format:?}")));
        }

        let (width, height) = image::ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| unsupported(e.to_string()))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            bytes,
            format,
            width,
            height,
        })
    }

    /// MIME type for the multipart part.
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}
