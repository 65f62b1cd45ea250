//! Driven port for sending one HTTP request to the movie API.
//!
//! The domain owns the request/response shapes so the pipeline can attach
//! credentials, observe latency and classify failures without knowing which
//! HTTP library sits underneath.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;
use crate::domain::AuthToken;

/// HTTP verbs used by the movie API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `DELETE`.
    Delete,
}

impl HttpMethod {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Outbound request relative to the configured API base URL.
///
/// # Examples
///
/// ```
/// use movies_client::domain::ports::{ApiRequest, HttpMethod};
///
/// let request = ApiRequest::get("/movies").with_query([("genre", "Drama")]);
/// assert_eq!(request.method, HttpMethod::Get);
/// assert_eq!(request.query, vec![("genre".to_owned(), "Drama".to_owned())]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path below the base URL, starting with `/`.
    pub path: String,
    /// Query pairs in send order.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Bearer credential for the `Authorization` header.
    pub bearer: Option<AuthToken>,
}

impl ApiRequest {
    /// Build a request with no query, body or credential.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `POST path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append query pairs.
    #[must_use]
    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a bearer credential.
    #[must_use]
    pub fn with_bearer(mut self, token: AuthToken) -> Self {
        self.bearer = Some(token);
        self
    }
}

/// Raw response: status plus body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Build a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as JSON, when it is JSON.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

define_port_error! {
    /// Failures where no HTTP response was received.
    pub enum TransportError {
        /// Connection, DNS or TLS failure.
        Unreachable { message: String } =>
            "api transport failed: {message}",
        /// The per-request timeout elapsed.
        Timeout { message: String } =>
            "api request timed out: {message}",
        /// The request could not be built (bad URL, unencodable header).
        InvalidRequest { message: String } =>
            "api request invalid: {message}",
    }
}

/// Port for dispatching one request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return whatever response came back, 2xx or not.
    ///
    /// Only failures where no response was received are errors.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}
