//! Reqwest-backed HTTP transport.
//!
//! This adapter owns transport details only: URL building, default headers,
//! the per-request timeout and mapping `reqwest` failures. Status handling
//! and retries belong to the domain pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};

use crate::domain::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, TransportError};

/// Per-request ceiling applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("movies-client/", env!("CARGO_PKG_VERSION"));

/// HTTP transport rooted at one API base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build a transport with JSON default headers and an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: &Url, timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
        })
    }

    /// Base URL every request path is appended to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = join_path(&self.base_url, &request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(request)?;
        let mut builder = self.client.request(to_method(request.method), url);
        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, token.bearer_header_value());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

/// Append `path` to `base`, keeping any path prefix the base carries.
///
/// `Url::join` would drop the last base segment (`/api/v1` + `movies` gives
/// `/api/movies`), so the strings are concatenated instead.
fn join_path(base: &str, path: &str) -> Result<Url, TransportError> {
    let separator = if path.starts_with('/') { "" } else { "/" };
    let raw = format!("{base}{separator}{path}");
    Url::parse(&raw)
        .map_err(|error| TransportError::invalid_request(format!("bad request url `{raw}`: {error}")))
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(error.to_string())
    } else if error.is_builder() {
        TransportError::invalid_request(error.to_string())
    } else {
        TransportError::unreachable(error.to_string())
    }
}
