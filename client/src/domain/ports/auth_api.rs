//! Driven port for the remote auth calls the session manager makes.
//!
//! Keeping this behind a trait lets session lifecycle tests substitute a
//! double and assert exactly which remote calls happened.

use async_trait::async_trait;

use crate::domain::{ApiError, AuthToken, LoginCredentials, User};

/// Successful login: the session to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// Authenticated user.
    pub user: User,
    /// Bearer token for the session.
    pub token: AuthToken,
}

/// Successful refresh: a new token and optionally a new profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    /// Replacement bearer token.
    pub token: AuthToken,
    /// Replacement profile, when the server sent one.
    pub user: Option<User>,
}

/// Remote authentication operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a session.
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginGrant, ApiError>;

    /// Invalidate `token` server-side.
    async fn logout(&self, token: &AuthToken) -> Result<(), ApiError>;

    /// Exchange `token` for a fresh one.
    async fn refresh(&self, token: &AuthToken) -> Result<RefreshGrant, ApiError>;

    /// Fetch the profile of the current session.
    async fn current_user(&self) -> Result<User, ApiError>;
}
