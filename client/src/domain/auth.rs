//! Authentication primitives: login credentials and bearer tokens.
//!
//! Constructors validate raw string input so the session manager and the
//! services only ever see well-formed values.

use std::fmt;

use serde::Serialize;
use zeroize::Zeroizing;

/// Error returned when login input or a bearer token is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    EmptyUsername,
    /// Password was blank.
    EmptyPassword,
    /// Bearer token was blank or contained whitespace.
    InvalidToken,
}

impl LoginValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "username",
            Self::EmptyPassword => "password",
            Self::InvalidToken => "token",
        }
    }
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "Username is required"),
            Self::EmptyPassword => write!(f, "Password is required"),
            Self::InvalidToken => write!(f, "bearer token must be a non-empty word"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` must be non-empty but keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use movies_client::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("alice", "hunter22").unwrap();
/// assert_eq!(creds.username(), "alice");
/// assert!(!creds.remember_me());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
    remember_me: bool,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
            remember_me: false,
        })
    }

    /// Mark the login as long-lived.
    #[must_use]
    pub fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    /// Username string sent to the login endpoint.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Whether the caller asked for a long-lived session.
    pub fn remember_me(&self) -> bool {
        self.remember_me
    }

    /// Wire body for `POST /auth/login`.
    pub(crate) fn to_request_body(&self) -> LoginRequestBody<'_> {
        LoginRequestBody {
            username: self.username(),
            password: self.password(),
            remember_me: self.remember_me.then_some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequestBody<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remember_me: Option<bool>,
}

/// Opaque bearer credential.
///
/// Any holder can act as the user until the token expires or is revoked, so
/// the value is wiped on drop and never printed by `Debug`.
///
/// # Examples
/// ```
/// use movies_client::domain::AuthToken;
///
/// let token = AuthToken::new("t1").unwrap();
/// assert_eq!(token.bearer_header_value(), "Bearer t1");
/// assert_eq!(format!("{token:?}"), "AuthToken(<redacted>)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(Zeroizing<String>);

impl AuthToken {
    /// Validate and wrap a raw token string.
    pub fn new(raw: impl Into<String>) -> Result<Self, LoginValidationError> {
        let raw = Zeroizing::new(raw.into());
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(LoginValidationError::InvalidToken);
        }
        Ok(Self(raw))
    }

    /// Raw token text, as persisted under the `token` storage key.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Value for the `Authorization` header.
    pub fn bearer_header_value(&self) -> String {
        format!("Bearer {}", self.as_str())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
