//! Remote authentication endpoints over the request pipeline.
//!
//! Credential exchanges (`login`, `register`, `logout`, `refresh`) bypass the
//! pipeline's refresh interception: a 401 there means the credentials are
//! wrong, not that the session expired.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::envelope::{Expectation, decode_data, expect_success};
use super::error::{ApiError, codes};
use super::http_pipeline::{HttpPipeline, REFRESH_PATH};
use super::ports::{ApiRequest, AuthApi, LoginGrant, RefreshGrant};
use super::{AuthToken, LoginCredentials, User};

const LOGIN: Expectation = Expectation::enveloped(codes::LOGIN_ERROR, "Login failed");
const REGISTER: Expectation = Expectation::enveloped(codes::REGISTER_ERROR, "Registration failed");
const LOGOUT: Expectation = Expectation::enveloped(codes::LOGOUT_ERROR, "Logout failed");
const REFRESH: Expectation = Expectation::enveloped(codes::REFRESH_ERROR, "Token refresh failed");
const VERIFY: Expectation = Expectation::enveloped(codes::VERIFY_ERROR, "Token verification failed");
const CURRENT_USER: Expectation =
    Expectation::enveloped(codes::USER_FETCH_ERROR, "Failed to fetch user profile");

#[derive(Debug, Deserialize)]
struct SessionPayload {
    user: User,
    token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
    token: String,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct VerifyPayload {
    valid: bool,
}

/// Sign-up form for `POST /auth/register`.
///
/// ## Invariants
/// - `username` is trimmed and non-empty.
/// - `email` is trimmed and has a non-empty local part and domain.
/// - `password` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    username: String,
    email: String,
    password: Zeroizing<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl Registration {
    /// Validate the required sign-up fields.
    pub fn try_new(username: &str, email: &str, password: &str) -> Result<Self, ApiError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::validation("username", "Username is required"));
        }
        let email = email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(ApiError::validation("email", "A valid email address is required"));
        }
        if password.is_empty() {
            return Err(ApiError::validation("password", "Password is required"));
        }
        Ok(Self {
            username: username.to_owned(),
            email: email.to_owned(),
            password: Zeroizing::new(password.to_owned()),
            first_name: None,
            last_name: None,
        })
    }

    /// Attach optional display names; blank values are dropped.
    #[must_use]
    pub fn with_names(mut self, first_name: Option<&str>, last_name: Option<&str>) -> Self {
        let tidy = |name: Option<&str>| {
            name.map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned)
        };
        self.first_name = tidy(first_name);
        self.last_name = tidy(last_name);
        self
    }

    /// Requested username.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    fn to_request_body(&self) -> RegistrationBody<'_> {
        RegistrationBody {
            username: self.username(),
            email: self.email(),
            password: self.password.as_str(),
            first_name: self.first_name.as_deref(),
            last_name: self.last_name.as_deref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
}

/// Auth endpoints of the movie API.
#[derive(Clone)]
pub struct AuthService {
    pipeline: Arc<HttpPipeline>,
}

impl AuthService {
    /// Build the service over a shared pipeline.
    pub fn new(pipeline: Arc<HttpPipeline>) -> Self {
        Self { pipeline }
    }

    /// Create an account and sign straight into it.
    pub async fn register(&self, registration: &Registration) -> Result<LoginGrant, ApiError> {
        let body = to_json(&registration.to_request_body())?;
        let response = self
            .pipeline
            .send_without_refresh(ApiRequest::post("/auth/register").with_json(body))
            .await?;
        let payload: SessionPayload = decode_data(&response, REGISTER)?;
        let grant = into_grant(payload, response.status, REGISTER)?;
        info!(username = grant.user.username(), "account registered");
        Ok(grant)
    }

    /// Ask the server whether the stored token is still valid.
    pub async fn verify_token(&self) -> Result<bool, ApiError> {
        let response = self.pipeline.send(ApiRequest::get("/auth/verify")).await?;
        let payload: VerifyPayload = decode_data(&response, VERIFY)?;
        Ok(payload.valid)
    }
}

#[async_trait]
impl AuthApi for AuthService {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginGrant, ApiError> {
        let body = to_json(&credentials.to_request_body())?;
        let response = self
            .pipeline
            .send_without_refresh(ApiRequest::post("/auth/login").with_json(body))
            .await?;
        let payload: SessionPayload = decode_data(&response, LOGIN)?;
        into_grant(payload, response.status, LOGIN)
    }

    async fn logout(&self, token: &AuthToken) -> Result<(), ApiError> {
        let response = self
            .pipeline
            .send_without_refresh(ApiRequest::post("/auth/logout").with_bearer(token.clone()))
            .await?;
        expect_success(&response, LOGOUT)
    }

    async fn refresh(&self, token: &AuthToken) -> Result<RefreshGrant, ApiError> {
        let response = self
            .pipeline
            .send_without_refresh(ApiRequest::post(REFRESH_PATH).with_bearer(token.clone()))
            .await?;
        let payload: RefreshPayload = decode_data(&response, REFRESH)?;
        let token = parse_token(payload.token, response.status, REFRESH)?;
        debug!(user_supplied = payload.user.is_some(), "refresh grant received");
        Ok(RefreshGrant {
            token,
            user: payload.user,
        })
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        let response = self.pipeline.send(ApiRequest::get("/auth/me")).await?;
        decode_data(&response, CURRENT_USER)
    }
}

fn into_grant(
    payload: SessionPayload,
    status: u16,
    expect: Expectation,
) -> Result<LoginGrant, ApiError> {
    Ok(LoginGrant {
        token: parse_token(payload.token, status, expect)?,
        user: payload.user,
    })
}

fn parse_token(raw: String, status: u16, expect: Expectation) -> Result<AuthToken, ApiError> {
    AuthToken::new(raw).map_err(|error| {
        ApiError::decode(status, format!("{}: {error}", expect.message), expect.code)
    })
}

fn to_json<T: Serialize>(body: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|error| ApiError::validation("body", format!("request body not encodable: {error}")))
}
