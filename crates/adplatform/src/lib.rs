//! Advertising platform client library.
//!
//! Provides local image asset checks, a Graph-style HTTP client for the
//! five resource-creation endpoints, typed error decoding and
//! classification, account/permission diagnostics, and the
//! [`AdPlatform`] seam consumed by the publishing pipeline.

pub mod asset;
pub mod client;
pub mod diagnostics;
pub mod error;
pub mod fake;
pub mod payload;
pub mod platform;
pub mod proof;

pub use asset::ImageAsset;
pub use client::{GraphApiClient, GraphConfig};
pub use error::{FailureKind, GraphErrorDetail, PlatformError, UploadError};
pub use platform::AdPlatform;
