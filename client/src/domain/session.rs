//! In-memory authentication state published by the session manager.

use super::{AuthToken, User};

/// Lifecycle phase of the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// `initialize` has not run yet.
    #[default]
    Uninitialized,
    /// Storage is being read.
    Initializing,
    /// User and token are both held.
    Authenticated,
    /// No usable session.
    Anonymous,
}

/// Snapshot of `{user, token, is_loading}`.
///
/// # Examples
/// ```
/// use movies_client::domain::{AuthToken, Session};
///
/// let token_only = Session {
///     token: Some(AuthToken::new("t1").unwrap()),
///     ..Session::default()
/// };
/// assert!(!token_only.is_authenticated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Current user profile.
    pub user: Option<User>,
    /// Current bearer token.
    pub token: Option<AuthToken>,
    /// Whether an initialise or login step is in flight.
    pub is_loading: bool,
}

impl Session {
    /// Session holding both halves of a login.
    pub fn authenticated(user: User, token: AuthToken) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            is_loading: false,
        }
    }

    /// True iff both the user and the token are present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// Phase implied by the held values once initialisation has finished.
    pub fn settled_phase(&self) -> SessionPhase {
        if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}

/// Value published to session observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current session values.
    pub session: Session,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
}
