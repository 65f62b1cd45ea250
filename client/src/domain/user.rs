//! User profile returned by the auth endpoints and persisted under the `user`
//! storage key.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Validation errors returned while building a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Identifier was missing or blank.
    EmptyId,
    /// Username was missing or blank.
    EmptyUsername,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::EmptyUsername => write!(f, "username must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Server-assigned user identifier.
///
/// The backend emits numeric ids while older payloads use strings; both are
/// held as their decimal/text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Optional profile attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Contact email.
    pub email: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Server-composed full name.
    pub full_name: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Account creation time as sent by the server.
    pub created_at: Option<String>,
    /// Last profile update as sent by the server.
    pub updated_at: Option<String>,
}

/// Authenticated user identity.
///
/// ## Invariants
/// - `id` and `username` are non-empty.
/// - A `User` is replaced wholesale on login and refresh; there are no
///   setters.
///
/// # Examples
/// ```
/// use movies_client::domain::User;
///
/// let user: User = serde_json::from_str(r#"{"id": 1, "username": "alice"}"#).unwrap();
/// assert_eq!(user.id().as_ref(), "1");
/// assert_eq!(user.display_name(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserDto", into = "UserDto")]
pub struct User {
    id: UserId,
    username: String,
    profile: UserProfile,
}

impl User {
    /// Build a user from validated parts.
    pub fn new(id: UserId, username: impl Into<String>, profile: UserProfile) -> Result<Self, UserValidationError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        Ok(Self {
            id,
            username,
            profile,
        })
    }

    /// Fallible constructor from raw strings with an empty profile.
    pub fn try_from_strings(
        id: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Self::new(UserId::new(id)?, username, UserProfile::default())
    }

    /// Stable identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Login name.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Optional profile attributes.
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Best human-facing name: full name, then first/last, then username.
    pub fn display_name(&self) -> String {
        if let Some(full) = self.profile.full_name.as_deref().filter(|s| !s.trim().is_empty()) {
            return full.to_owned();
        }
        let parts: Vec<&str> = [
            self.profile.first_name.as_deref(),
            self.profile.last_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }

    /// Account creation time, when the server sent a parseable timestamp.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.profile.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse RFC 3339 or zone-less ISO-8601 timestamps.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.naive_utc())
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(i64),
    Text(String),
}

impl From<IdRepr> for String {
    fn from(value: IdRepr) -> Self {
        match value {
            IdRepr::Number(n) => n.to_string(),
            IdRepr::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: IdRepr,
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        let User {
            id,
            username,
            profile,
        } = value;
        Self {
            id: IdRepr::Text(id.0),
            username,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            full_name: profile.full_name,
            avatar_url: profile.avatar_url,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = UserValidationError;

    fn try_from(value: UserDto) -> Result<Self, Self::Error> {
        let profile = UserProfile {
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            full_name: value.full_name,
            avatar_url: value.avatar_url,
            created_at: value.created_at,
            updated_at: value.updated_at,
        };
        User::new(UserId::new(value.id)?, value.username, profile)
    }
}
