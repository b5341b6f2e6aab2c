//! Platform error decoding and classification.
//!
//! Error responses have the shape `{"error": {"message", "type", "code",
//! "error_subcode", "is_transient", ...}}`. They are decoded into a
//! [`GraphErrorDetail`] and classified into a [`FailureKind`] from the
//! typed fields, so retry decisions never depend on substring matches
//! against the serialized payload.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Codes the platform documents as temporary ("unknown error", "service
/// temporarily unavailable").
const TEMPORARY_CODES: &[i64] = &[1, 2];

/// Application, user, page and ad-account level throttling codes.
const RATE_LIMIT_CODES: &[i64] = &[4, 17, 32, 613, 80004];

/// Invalid or expired access token, or session key missing.
const AUTH_CODES: &[i64] = &[102, 190];

/// Generic permission denial (`10`) and the `200..=299` permission range.
fn is_permission_code(code: i64) -> bool {
    code == 10 || (200..=299).contains(&code)
}

/// Invalid parameter.
const INVALID_PARAMETER_CODE: i64 = 100;

// ---------------------------------------------------------------------------
// Detail payload
// ---------------------------------------------------------------------------

/// Decoded `error` object of a platform error response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub is_transient: Option<bool>,
    #[serde(default)]
    pub error_user_title: Option<String>,
    #[serde(default)]
    pub error_user_msg: Option<String>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

#[derive(Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorDetail,
}

impl GraphErrorDetail {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn transient(mut self, is_transient: bool) -> Self {
        self.is_transient = Some(is_transient);
        self
    }

    pub fn subcode(mut self, subcode: i64) -> Self {
        self.error_subcode = Some(subcode);
        self
    }

    /// Decode an error response body. Returns `None` when the body is not
    /// a platform error envelope.
    pub fn decode(body: &str) -> Option<Self> {
        serde_json::from_str::<GraphErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }

    fn mentions_page(&self) -> bool {
        [Some(&self.message), self.error_user_msg.as_ref()]
            .into_iter()
            .flatten()
            .any(|text| text.to_ascii_lowercase().contains("page"))
    }
}

impl fmt::Display for GraphErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (self.code, self.error_subcode) {
            (Some(code), Some(sub)) => write!(f, " (code {code}, subcode {sub})")?,
            (Some(code), None) => write!(f, " (code {code})")?,
            _ => {}
        }
        if let Some(user_msg) = &self.error_user_msg {
            write!(f, ": {user_msg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What went wrong, as far as the caller's corrective action goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Server-side fault expected to clear on retry.
    Transient,
    /// Throttled; retry after backing off.
    RateLimited,
    /// Access token invalid or expired.
    Auth,
    /// Token lacks a permission for this operation.
    Permission,
    /// The page the creative is attributed to is missing or not usable
    /// by this token / ad account.
    PageIdentity,
    /// A request parameter was rejected.
    InvalidParameter,
    Other,
}

impl FailureKind {
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::Transient | FailureKind::RateLimited)
    }

    /// Corrective action for an operator.
    pub fn remedy(self) -> &'static str {
        match self {
            FailureKind::Transient => "retry later; the platform reported a temporary fault",
            FailureKind::RateLimited => "slow down; the account or app is being throttled",
            FailureKind::Auth => "re-authenticate: generate a new access token",
            FailureKind::Permission => {
                "grant the missing permissions (ads_management, business_management) to the token"
            }
            FailureKind::PageIdentity => {
                "reconfigure the page binding: check META_PAGE_ID and that the page is connected to the ad account"
            }
            FailureKind::InvalidParameter => "fix the rejected request parameter",
            FailureKind::Other => "inspect the platform error message",
        }
    }
}

/// Classify a decoded error response.
pub fn classify(status: u16, detail: &GraphErrorDetail) -> FailureKind {
    if detail.is_transient == Some(true) {
        return FailureKind::Transient;
    }

    if let Some(code) = detail.code {
        if TEMPORARY_CODES.contains(&code) {
            return FailureKind::Transient;
        }
        if RATE_LIMIT_CODES.contains(&code) {
            return FailureKind::RateLimited;
        }
        if AUTH_CODES.contains(&code) {
            return FailureKind::Auth;
        }
        if (code == INVALID_PARAMETER_CODE || is_permission_code(code)) && detail.mentions_page() {
            return FailureKind::PageIdentity;
        }
        if is_permission_code(code) {
            return FailureKind::Permission;
        }
        if code == INVALID_PARAMETER_CODE {
            return FailureKind::InvalidParameter;
        }
    }

    classify_status(status)
}

/// Classify from the HTTP status alone.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        429 => FailureKind::RateLimited,
        401 => FailureKind::Auth,
        403 => FailureKind::Permission,
        s if s >= 500 => FailureKind::Transient,
        _ => FailureKind::Other,
    }
}

// ---------------------------------------------------------------------------
// PlatformError
// ---------------------------------------------------------------------------

/// Errors from a remote platform call.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform returned a decodable error payload.
    #[error("Platform API error ({status}): {detail}")]
    Api {
        status: u16,
        detail: GraphErrorDetail,
    },

    /// Non-2xx response whose body is not an error envelope.
    #[error("Platform API error ({status}): {body}")]
    Unparsed { status: u16, body: String },

    /// A 2xx response that lacks the expected fields.
    #[error("Unexpected platform response: {0}")]
    Decode(String),
}

impl PlatformError {
    /// Build the error for a non-2xx response body.
    pub fn from_response(status: u16, body: &str) -> Self {
        match GraphErrorDetail::decode(body) {
            Some(detail) => PlatformError::Api { status, detail },
            None => PlatformError::Unparsed {
                status,
                body: body.to_string(),
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PlatformError::Request(e) if e.is_timeout() || e.is_connect() => {
                FailureKind::Transient
            }
            PlatformError::Request(_) => FailureKind::Other,
            PlatformError::Api { status, detail } => classify(*status, detail),
            PlatformError::Unparsed { status, .. } => classify_status(*status),
            PlatformError::Decode(_) => FailureKind::Other,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }

    /// Decoded payload, if the platform sent one.
    pub fn detail(&self) -> Option<&GraphErrorDetail> {
        match self {
            PlatformError::Api { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// UploadError
// ---------------------------------------------------------------------------

/// Errors from the image upload step: local file problems or a rejected
/// upload payload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Image file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read image {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image {} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("Image {} is {size} bytes; maximum is {max}", path.display())]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Image {} is not a supported PNG, JPEG or WebP file: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Image upload rejected: {0}")]
    Rejected(#[source] PlatformError),

    #[error("Upload response did not include an image hash")]
    MissingHash,
}
