//! Owner of the authentication lifecycle.
//!
//! One [`SessionManager`] is built at startup and injected wherever session
//! state is needed. Readers take snapshots or subscribe to the watch channel;
//! mutations (`initialize`, `login`, `logout`, `refresh_token`,
//! `reload_user`) queue behind a single async gate, so a logout and a refresh
//! started together run one after the other instead of racing on storage.
//!
//! Storage is written before the in-memory state is published. The request
//! pipeline may rotate the stored token on its own; until the next mutation
//! the in-memory token can lag behind storage, and `logout` and
//! `refresh_token` therefore prefer the stored token. When the pipeline gives
//! up on a refresh it clears storage and fires its login redirect; routing
//! that redirect through a [`SessionTeardown`] signs the manager out too.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

use super::error::ApiError;
use super::ports::{
    AuthApi, LoginGrant, LoginRedirect, RefreshGrant, SessionStore, StorageKey,
    TracingLoginRedirect,
};
use super::session::{Session, SessionPhase, SessionState};
use super::{AuthToken, LoginCredentials, User};

/// Login redirect that also discards the in-memory session.
///
/// Hand a clone to [`HttpPipeline::with_login_redirect`] and build the manager
/// with [`SessionManager::with_teardown`]; an abandoned refresh then leaves the
/// manager anonymous before `next` runs.
///
/// [`HttpPipeline::with_login_redirect`]: super::HttpPipeline::with_login_redirect
#[derive(Clone)]
pub struct SessionTeardown {
    state: Arc<watch::Sender<SessionState>>,
    next: Arc<dyn LoginRedirect>,
}

impl SessionTeardown {
    /// Teardown hook that forwards to `next` once the session is cleared.
    pub fn new(next: Arc<dyn LoginRedirect>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
            next,
        }
    }
}

impl LoginRedirect for SessionTeardown {
    fn redirect_to_login(&self, entry_point: &str) {
        self.state.send_modify(|state| {
            if state.phase != SessionPhase::Uninitialized {
                state.phase = SessionPhase::Anonymous;
            }
            state.session = Session::default();
        });
        info!(entry_point, "session torn down after failed refresh");
        self.next.redirect_to_login(entry_point);
    }
}

/// Single owned container of `{user, token, is_loading}`.
pub struct SessionManager {
    auth: Arc<dyn AuthApi>,
    store: Arc<dyn SessionStore>,
    state: Arc<watch::Sender<SessionState>>,
    gate: Mutex<()>,
}

impl SessionManager {
    /// Build an uninitialised manager with no link to a pipeline.
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_teardown(
            auth,
            store,
            &SessionTeardown::new(Arc::new(TracingLoginRedirect)),
        )
    }

    /// Build an uninitialised manager whose state `teardown` can clear.
    pub fn with_teardown(
        auth: Arc<dyn AuthApi>,
        store: Arc<dyn SessionStore>,
        teardown: &SessionTeardown,
    ) -> Self {
        Self {
            auth,
            store,
            state: Arc::clone(&teardown.state),
            gate: Mutex::new(()),
        }
    }

    /// Current session values.
    pub fn session(&self) -> Session {
        self.state.borrow().session.clone()
    }

    /// Current user, if any.
    pub fn user(&self) -> Option<User> {
        self.state.borrow().session.user.clone()
    }

    /// Current in-memory token, if any.
    pub fn token(&self) -> Option<AuthToken> {
        self.state.borrow().session.token.clone()
    }

    /// True iff both user and token are held.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session.is_authenticated()
    }

    /// Whether an initialise or login step is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().session.is_loading
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    /// Observe every published state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Restore the session persisted by a previous run.
    ///
    /// Runs once; later calls return the current session untouched. A stored
    /// token and a parseable stored user are adopted without a network call.
    /// Anything less is treated as stale and cleared.
    pub async fn initialize(&self) -> Session {
        let _gate = self.gate.lock().await;
        if self.phase() != SessionPhase::Uninitialized {
            return self.session();
        }

        self.state.send_modify(|state| {
            state.phase = SessionPhase::Initializing;
            state.session.is_loading = true;
        });

        let session = match self.read_persisted() {
            Some((user, token)) => {
                info!(username = user.username(), "restored persisted session");
                Session::authenticated(user, token)
            }
            None => {
                self.clear_storage();
                Session::default()
            }
        };
        self.publish(session.clone());
        session
    }

    /// Exchange `credentials` for a session.
    ///
    /// On failure the previous session is kept and the error returned.
    /// `credentials` are consumed so the password does not outlive the call.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<User, ApiError> {
        let _gate = self.gate.lock().await;
        self.state
            .send_modify(|state| state.session.is_loading = true);

        let outcome = self.auth.login(&credentials).await;
        let username = credentials.username().to_owned();
        drop(credentials);

        let grant = match outcome {
            Ok(grant) => grant,
            Err(error) => {
                warn!(%username, code = error.code(), "login failed");
                self.state
                    .send_modify(|state| state.session.is_loading = false);
                return Err(error);
            }
        };

        let user = self.install(grant)?;
        info!(%username, "logged in");
        Ok(user)
    }

    /// Adopt a session granted outside [`Self::login`], such as by
    /// registration.
    ///
    /// Persists and publishes exactly as a successful login would.
    pub async fn adopt(&self, grant: LoginGrant) -> Result<User, ApiError> {
        let _gate = self.gate.lock().await;
        self.state
            .send_modify(|state| state.session.is_loading = true);
        let user = self.install(grant)?;
        info!(username = user.username(), "adopted granted session");
        Ok(user)
    }

    /// End the session. Never fails.
    ///
    /// The remote logout is best effort; storage and memory are cleared
    /// whatever it returns.
    pub async fn logout(&self) {
        let _gate = self.gate.lock().await;
        self.sign_out().await;
    }

    /// Exchange the current token for a fresh one.
    ///
    /// Fails with a `NoToken` error, and makes no call, when no token is held.
    /// Any other failure signs out before it is returned.
    pub async fn refresh_token(&self) -> Result<AuthToken, ApiError> {
        let _gate = self.gate.lock().await;
        let Some(current) = self.current_token() else {
            return Err(ApiError::no_token());
        };

        let outcome = match self.auth.refresh(&current).await {
            Ok(grant) => self.persist_refresh(&grant).map(|()| grant),
            Err(error) => Err(error),
        };
        match outcome {
            Ok(RefreshGrant { token, user }) => {
                let mut session = self.session();
                session.token = Some(token.clone());
                if let Some(user) = user {
                    session.user = Some(user);
                }
                self.publish(session);
                info!("session token refreshed");
                Ok(token)
            }
            Err(error) => {
                warn!(code = error.code(), "token refresh failed; signing out");
                self.sign_out().await;
                Err(error)
            }
        }
    }

    /// Fetch the profile from the server and replace the held user.
    pub async fn reload_user(&self) -> Result<User, ApiError> {
        let _gate = self.gate.lock().await;
        let user = self.auth.current_user().await?;
        self.store.set(StorageKey::User, &encode_user(&user)?)?;
        let mut session = self.session();
        session.user = Some(user.clone());
        self.publish(session);
        Ok(user)
    }

    fn install(&self, grant: LoginGrant) -> Result<User, ApiError> {
        if let Err(error) = self.persist(&grant.user, &grant.token) {
            error!(%error, "failed to persist session; restoring previous one");
            self.rewrite_storage(&self.session());
            self.state
                .send_modify(|state| state.session.is_loading = false);
            return Err(error);
        }
        self.publish(Session::authenticated(grant.user.clone(), grant.token));
        Ok(grant.user)
    }

    async fn sign_out(&self) {
        if let Some(token) = self.current_token() {
            if let Err(error) = self.auth.logout(&token).await {
                warn!(code = error.code(), status = error.status(), "remote logout failed");
            }
        }
        self.clear_storage();
        self.publish(Session::default());
        info!("logged out");
    }

    fn publish(&self, session: Session) {
        self.state.send_modify(|state| {
            state.phase = session.settled_phase();
            state.session = Session {
                is_loading: false,
                ..session
            };
        });
    }

    fn current_token(&self) -> Option<AuthToken> {
        match self.store.get(StorageKey::Token) {
            Ok(Some(raw)) => AuthToken::new(raw).ok().or_else(|| self.token()),
            Ok(None) => self.token(),
            Err(error) => {
                warn!(%error, "could not read stored token; using in-memory token");
                self.token()
            }
        }
    }

    fn read_persisted(&self) -> Option<(User, AuthToken)> {
        let read = |key: StorageKey| match self.store.get(key) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, key = key.as_str(), "could not read persisted session");
                None
            }
        };
        let token = AuthToken::new(read(StorageKey::Token)?).ok()?;
        let raw_user = read(StorageKey::User)?;
        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => Some((user, token)),
            Err(error) => {
                warn!(%error, "discarding unparseable persisted user");
                None
            }
        }
    }

    fn persist(&self, user: &User, token: &AuthToken) -> Result<(), ApiError> {
        let user_json = encode_user(user)?;
        self.store.set(StorageKey::Token, token.as_str())?;
        self.store.set(StorageKey::User, &user_json)?;
        Ok(())
    }

    fn persist_refresh(&self, grant: &RefreshGrant) -> Result<(), ApiError> {
        match &grant.user {
            Some(user) => self.persist(user, &grant.token),
            None => Ok(self.store.set(StorageKey::Token, grant.token.as_str())?),
        }
    }

    fn rewrite_storage(&self, session: &Session) {
        let outcome = match (&session.user, &session.token) {
            (Some(user), Some(token)) => self.persist(user, token),
            _ => self.store.clear().map_err(ApiError::from),
        };
        if let Err(error) = outcome {
            error!(%error, "failed to rewrite persisted session");
        }
    }

    fn clear_storage(&self) {
        if let Err(error) = self.store.clear() {
            error!(%error, "failed to clear persisted session");
        }
    }
}

fn encode_user(user: &User) -> Result<String, ApiError> {
    serde_json::to_string(user)
        .map_err(|error| ApiError::storage(format!("user not serialisable: {error}")))
}

#[cfg(test)]
mod tests;
