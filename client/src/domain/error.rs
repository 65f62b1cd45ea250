//! Client-side error type every failure is normalised to.
//!
//! Whatever goes wrong (no route to the server, a non-2xx response, a
//! refresh attempted without a session, form input rejected locally) callers
//! receive an [`ApiError`] carrying `{message, code, status, details?}`.

use serde::Serialize;
use serde_json::{Value, json};

use super::auth::LoginValidationError;
use super::ports::SessionStoreError;

/// Stable machine-readable error codes produced by this crate.
///
/// Server-supplied codes pass through unchanged and are not listed here.
pub mod codes {
    /// No response reached the client.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    /// Refresh attempted without a stored session token.
    pub const NO_TOKEN: &str = "NO_TOKEN";
    /// Input rejected before any network call.
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    /// Durable session storage failed.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    /// Login rejected or malformed login payload.
    pub const LOGIN_ERROR: &str = "LOGIN_ERROR";
    /// Logout rejected by the server (only ever logged).
    pub const LOGOUT_ERROR: &str = "LOGOUT_ERROR";
    /// Registration rejected or malformed registration payload.
    pub const REGISTER_ERROR: &str = "REGISTER_ERROR";
    /// Token refresh rejected or malformed refresh payload.
    pub const REFRESH_ERROR: &str = "REFRESH_ERROR";
    /// Token verification failed.
    pub const VERIFY_ERROR: &str = "VERIFY_ERROR";
    /// Current user lookup failed.
    pub const USER_FETCH_ERROR: &str = "USER_FETCH_ERROR";
    /// Movie listing failed.
    pub const MOVIES_FETCH_ERROR: &str = "MOVIES_FETCH_ERROR";
    /// Single movie lookup failed.
    pub const MOVIE_FETCH_ERROR: &str = "MOVIE_FETCH_ERROR";
    /// Review submission failed.
    pub const REVIEW_SUBMIT_ERROR: &str = "REVIEW_SUBMIT_ERROR";
}

/// Local classification of an [`ApiError`].
///
/// Not part of the serialised shape; callers use it to branch without string
/// matching on `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No response was received (unreachable host, timeout, DNS failure).
    Network,
    /// The server answered with a failure status or a `success: false` body.
    Http,
    /// A refresh was attempted while no token was held.
    NoToken,
    /// Input was rejected locally before any network call.
    Validation,
    /// A successful response did not match the expected payload shape.
    Decode,
    /// Durable session storage could not be read or written.
    Storage,
}

/// Normalised failure shape returned by the pipeline and the services.
///
/// ## Invariants
/// - `status` is `0` whenever no HTTP response was involved.
/// - `code` is never empty.
///
/// # Examples
/// ```
/// use movies_client::domain::{ApiError, ErrorKind};
///
/// let err = ApiError::network();
/// assert_eq!(err.kind(), ErrorKind::Network);
/// assert_eq!(err.code(), "NETWORK_ERROR");
/// assert_eq!(err.status(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({code})")]
pub struct ApiError {
    #[serde(skip)]
    kind: ErrorKind,
    message: String,
    code: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>, code: impl Into<String>, status: u16) -> Self {
        let code = code.into();
        Self {
            kind,
            message: message.into(),
            code: if code.trim().is_empty() {
                format!("HTTP_{status}")
            } else {
                code
            },
            status,
            details: None,
        }
    }

    /// No response reached the client.
    pub fn network() -> Self {
        Self::new(
            ErrorKind::Network,
            "Network error. Please check your internet connection.",
            codes::NETWORK_ERROR,
            0,
        )
    }

    /// The server answered with a failure.
    pub fn http(status: u16, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(ErrorKind::Http, message, code, status)
    }

    /// A refresh was attempted with no session token.
    pub fn no_token() -> Self {
        Self::new(
            ErrorKind::NoToken,
            "No token available for refresh",
            codes::NO_TOKEN,
            0,
        )
    }

    /// Input for `field` was rejected before any network call.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, codes::VALIDATION_ERROR, 0)
            .with_details(json!({ "field": field }))
    }

    /// A 2xx response did not match the payload contract.
    pub fn decode(status: u16, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message, code, status)
    }

    /// Durable session storage failed.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message, codes::STORAGE_ERROR, 0)
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Local classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Machine-readable code (server-supplied or one of [`codes`]).
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// HTTP status, or `0` when no response was involved.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Supplementary details, if any.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Whether the server rejected the request for authorization reasons.
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Http && self.status == 401
    }
}

impl From<LoginValidationError> for ApiError {
    fn from(value: LoginValidationError) -> Self {
        Self::validation(value.field(), value.to_string())
    }
}

impl From<SessionStoreError> for ApiError {
    fn from(value: SessionStoreError) -> Self {
        Self::storage(value.to_string())
    }
}
