use std::path::PathBuf;

use adgen_core::error::CoreError;

/// Errors from the image provider layer.
#[derive(Debug, thiserror::Error)]
pub enum ImageGenError {
    /// The prompt or options were rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The image API returned a non-2xx status code.
    #[error("Image API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response carried no usable image.
    #[error("Image API returned no image data")]
    EmptyResponse,

    /// Writing the downloaded bytes to disk failed.
    #[error("Failed to write image to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
