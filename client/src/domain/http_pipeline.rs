//! The single request sender every service call goes through.
//!
//! Responsibilities:
//! - attach the stored bearer token to outgoing requests;
//! - observe latency with the injected clock;
//! - normalise transport and HTTP failures into [`ApiError`];
//! - on a first 401, refresh the token once and replay the request.
//!
//! Retry state travels with each request as a [`PendingRequest`], so
//! concurrent calls never share a retry flag.

use std::sync::Arc;

use mockable::Clock;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::envelope::ApiEnvelope;
use super::error::{ApiError, codes};
use super::ports::{
    ApiRequest, ApiResponse, HttpTransport, LoginRedirect, SessionStore, StorageKey,
    TracingLoginRedirect,
};
use super::AuthToken;

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";
/// Login entry point used when none is configured.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

const REFRESH_FAILED_MESSAGE: &str = "Token refresh failed";

/// A request plus its retry flag.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Request to dispatch.
    pub request: ApiRequest,
    /// Set once the request has been replayed after a refresh, or for calls
    /// that must never trigger a refresh.
    pub already_retried: bool,
}

impl PendingRequest {
    /// Fresh request eligible for one refresh-and-retry.
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            already_retried: false,
        }
    }

    /// Request that must not trigger a refresh.
    pub fn without_refresh(request: ApiRequest) -> Self {
        Self {
            request,
            already_retried: true,
        }
    }

    /// Replay of this request carrying `token`.
    #[must_use]
    pub fn into_retry(mut self, token: AuthToken) -> Self {
        self.request.bearer = Some(token);
        self.already_retried = true;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RefreshedToken {
    token: String,
}

/// Configured request sender shared by every service.
#[derive(Clone)]
pub struct HttpPipeline {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    redirect: Arc<dyn LoginRedirect>,
    login_path: String,
}

impl HttpPipeline {
    /// Build a pipeline that logs forced logouts instead of navigating.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            store,
            clock,
            redirect: Arc::new(TracingLoginRedirect),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
        }
    }

    /// Use `redirect` and `login_path` when a refresh cannot be recovered.
    #[must_use]
    pub fn with_login_redirect(
        mut self,
        redirect: Arc<dyn LoginRedirect>,
        login_path: impl Into<String>,
    ) -> Self {
        self.redirect = redirect;
        self.login_path = login_path.into();
        self
    }

    /// Storage the pipeline reads tokens from.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// Send `request`, refreshing and retrying once on a first 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatch(PendingRequest::new(request)).await
    }

    /// Send `request` with no refresh interception.
    ///
    /// Used by the auth endpoints, whose 401s mean bad credentials rather
    /// than an expired session.
    pub async fn send_without_refresh(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatch(PendingRequest::without_refresh(request)).await
    }

    /// Send an explicit pending request.
    pub async fn dispatch(&self, pending: PendingRequest) -> Result<ApiResponse, ApiError> {
        let pending = self.attach_stored_token(pending)?;
        let response = self.execute(&pending.request).await?;
        if response.is_success() {
            return Ok(response);
        }

        if response.status != 401 || pending.already_retried {
            return Err(normalise_http_error(&pending.request, &response));
        }

        match self.refresh_stored_token().await {
            Ok(Some(token)) => {
                let retry = pending.into_retry(token);
                let response = self.execute(&retry.request).await?;
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(normalise_http_error(&retry.request, &response))
                }
            }
            Ok(None) => Err(normalise_http_error(&pending.request, &response)),
            Err(refresh_error) => Err(self.abandon_session(refresh_error)),
        }
    }

    fn attach_stored_token(&self, mut pending: PendingRequest) -> Result<PendingRequest, ApiError> {
        if pending.request.bearer.is_none() {
            pending.request.bearer = self.stored_token()?;
        }
        Ok(pending)
    }

    fn stored_token(&self) -> Result<Option<AuthToken>, ApiError> {
        let Some(raw) = self.store.get(StorageKey::Token)? else {
            return Ok(None);
        };
        match AuthToken::new(raw) {
            Ok(token) => Ok(Some(token)),
            Err(error) => {
                warn!(%error, "ignoring malformed stored token");
                Ok(None)
            }
        }
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let started = self.clock.utc();
        let outcome = self.transport.send(request).await;
        let elapsed_ms = (self.clock.utc() - started).num_milliseconds();
        match outcome {
            Ok(response) => {
                debug!(
                    method = request.method.as_str(),
                    path = %request.path,
                    status = response.status,
                    elapsed_ms,
                    "api call completed"
                );
                Ok(response)
            }
            Err(transport_error) => {
                warn!(
                    method = request.method.as_str(),
                    path = %request.path,
                    elapsed_ms,
                    error = %transport_error,
                    "api call received no response"
                );
                Err(ApiError::network())
            }
        }
    }

    /// `Ok(None)` when the server answered 2xx but declined the refresh.
    async fn refresh_stored_token(&self) -> Result<Option<AuthToken>, ApiError> {
        let current = self.stored_token()?.ok_or_else(ApiError::no_token)?;
        let request = ApiRequest::post(REFRESH_PATH).with_bearer(current);
        let response = self.execute(&request).await?;
        if !response.is_success() {
            return Err(normalise_http_error(&request, &response));
        }

        let envelope: ApiEnvelope<RefreshedToken> = serde_json::from_slice(&response.body)
            .map_err(|error| refresh_decode_error(response.status, &error.to_string()))?;
        if !envelope.success {
            info!(status = response.status, "token refresh declined by server");
            return Ok(None);
        }
        let raw = envelope
            .data
            .ok_or_else(|| refresh_decode_error(response.status, "response carried no token"))?
            .token;
        let token = AuthToken::new(raw)
            .map_err(|error| refresh_decode_error(response.status, &error.to_string()))?;

        self.store.set(StorageKey::Token, token.as_str())?;
        info!("session token refreshed");
        Ok(Some(token))
    }

    fn abandon_session(&self, refresh_error: ApiError) -> ApiError {
        warn!(
            code = refresh_error.code(),
            status = refresh_error.status(),
            "token refresh failed; clearing stored session"
        );
        if let Err(error) = self.store.clear() {
            error!(%error, "failed to clear stored session");
        }
        self.redirect.redirect_to_login(&self.login_path);
        refresh_error
    }
}

fn refresh_decode_error(status: u16, detail: &str) -> ApiError {
    ApiError::decode(
        status,
        format!("{REFRESH_FAILED_MESSAGE}: {detail}"),
        codes::REFRESH_ERROR,
    )
}

/// Build the [`ApiError`] for a non-2xx response.
///
/// Server `message`, `code` and `details` win; otherwise a generic message,
/// `HTTP_<status>` and the whole JSON body are used.
pub(crate) fn normalise_http_error(request: &ApiRequest, response: &ApiResponse) -> ApiError {
    let body = response.json_body().filter(|value| !value.is_null());
    let field = |name: &str| {
        body.as_ref()
            .and_then(Value::as_object)
            .and_then(|object| object.get(name))
            .filter(|value| !value.is_null())
    };

    let message = field("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map_or_else(
            || format!("Request failed with status code {}", response.status),
            str::to_owned,
        );
    let code = field("code")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let details = field("details").cloned().or_else(|| body.clone());

    let normalised = ApiError::http(response.status, message, code);
    error!(
        method = request.method.as_str(),
        path = %request.path,
        status = response.status,
        code = normalised.code(),
        message = normalised.message(),
        "api error"
    );
    match details {
        Some(details) => normalised.with_details(details),
        None => normalised,
    }
}
