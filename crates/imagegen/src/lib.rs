//! Image provider client library.
//!
//! Wraps the image-generation HTTP API, persists generated images to
//! local storage, and exposes the [`ImageProvider`] seam consumed by the
//! automation pipeline (with an in-memory fake for tests).

pub mod api;
pub mod download;
pub mod error;
pub mod fake;
pub mod provider;

pub use api::ImageGenApi;
pub use error::ImageGenError;
pub use provider::{generate_variations, GeneratedImage, ImageProvider, Variation};
