//! Response envelope shared by every endpoint, and payload decoding helpers.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use super::ports::ApiResponse;

/// `{ success, data, message?, code?, details? }` wrapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the server considers the call successful.
    pub success: bool,
    /// Payload; absent on failures and on data-less successes.
    pub data: Option<T>,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable failure code.
    #[serde(default)]
    pub code: Option<String>,
    /// Structured failure details.
    #[serde(default)]
    pub details: Option<Value>,
}

/// What to report when a 2xx body is not a usable payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Expectation {
    /// Operation failure code used when the server supplies none.
    pub code: &'static str,
    /// Operation failure message used when the server supplies none.
    pub message: &'static str,
    /// Whether a bare (non-enveloped) JSON payload is acceptable.
    pub allow_bare: bool,
}

impl Expectation {
    pub(crate) const fn enveloped(code: &'static str, message: &'static str) -> Self {
        Self {
            code,
            message,
            allow_bare: false,
        }
    }

    pub(crate) const fn lenient(code: &'static str, message: &'static str) -> Self {
        Self {
            code,
            message,
            allow_bare: true,
        }
    }
}

/// Decode the `data` of a successful response.
///
/// `success: false` becomes an `Http` error carrying the server's message and
/// code (falling back to the operation's); anything that does not decode
/// becomes a `Decode` error.
pub(crate) fn decode_data<T: DeserializeOwned>(
    response: &ApiResponse,
    expect: Expectation,
) -> Result<T, ApiError> {
    let value: Value = serde_json::from_slice(&response.body).map_err(|error| {
        ApiError::decode(
            response.status,
            format!("{}: invalid JSON payload: {error}", expect.message),
            expect.code,
        )
    })?;

    let is_envelope = value.as_object().is_some_and(|o| o.contains_key("success"));
    if !is_envelope {
        if !expect.allow_bare {
            return Err(ApiError::decode(
                response.status,
                format!("{}: response is not an API envelope", expect.message),
                expect.code,
            ));
        }
        return serde_json::from_value(value).map_err(|error| {
            ApiError::decode(
                response.status,
                format!("{}: unexpected payload: {error}", expect.message),
                expect.code,
            )
        });
    }

    let envelope: ApiEnvelope<T> = serde_json::from_value(value).map_err(|error| {
        ApiError::decode(
            response.status,
            format!("{}: unexpected payload: {error}", expect.message),
            expect.code,
        )
    })?;
    envelope_data(envelope, response.status, expect)
}

/// Check the envelope of a successful response that carries no payload.
pub(crate) fn expect_success(response: &ApiResponse, expect: Expectation) -> Result<(), ApiError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    match serde_json::from_slice::<ApiEnvelope<Value>>(&response.body) {
        Ok(envelope) if !envelope.success => Err(envelope_failure(envelope, response.status, expect)),
        _ => Ok(()),
    }
}

fn envelope_data<T>(
    envelope: ApiEnvelope<T>,
    status: u16,
    expect: Expectation,
) -> Result<T, ApiError> {
    if !envelope.success {
        return Err(envelope_failure(envelope, status, expect));
    }
    envelope.data.ok_or_else(|| {
        ApiError::decode(
            status,
            format!("{}: response carried no data", expect.message),
            expect.code,
        )
    })
}

fn envelope_failure<T>(envelope: ApiEnvelope<T>, status: u16, expect: Expectation) -> ApiError {
    let message = envelope
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| expect.message.to_owned());
    let code = envelope
        .code
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| expect.code.to_owned());
    let error = ApiError::http(status, message, code);
    match envelope.details {
        Some(details) => error.with_details(details),
        None => error,
    }
}
