//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`).
//!
//! Only compiled for tests or with the `test-support` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;

use crate::domain::ports::{
    ApiRequest, ApiResponse, HttpTransport, InMemorySessionStore, LoginRedirect, SessionStore,
    TransportError,
};
use crate::domain::HttpPipeline;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("test double mutex poisoned"),
    }
}

/// Transport that answers from a FIFO script and records every request.
///
/// Running out of script answers with [`TransportError::Unreachable`], so a
/// test that expects no network traffic can script nothing and assert
/// [`ScriptedTransport::sent`] is empty.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    /// Transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply.
    #[must_use]
    pub fn reply(self, status: u16, body: &Value) -> Self {
        self.push(Ok(ApiResponse::json(status, body)));
        self
    }

    /// Queue a raw reply.
    #[must_use]
    pub fn reply_raw(self, status: u16, body: &str) -> Self {
        self.push(Ok(ApiResponse::new(status, body)));
        self
    }

    /// Queue a transport failure.
    #[must_use]
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error));
        self
    }

    /// Queue an outcome on a shared transport.
    pub fn push(&self, outcome: Result<ApiResponse, TransportError>) {
        lock(&self.replies).push_back(outcome);
    }

    /// Requests received so far.
    pub fn sent(&self) -> Vec<ApiRequest> {
        lock(&self.sent).clone()
    }

    /// Paths of the requests received so far.
    pub fn sent_paths(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|r| r.path.clone()).collect()
    }

    /// Bearer token text carried by each request.
    pub fn sent_bearers(&self) -> Vec<Option<String>> {
        lock(&self.sent)
            .iter()
            .map(|r| r.bearer.as_ref().map(|t| t.as_str().to_owned()))
            .collect()
    }

    /// Number of scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        lock(&self.sent).push(request.clone());
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::unreachable("script exhausted")))
    }
}

/// Redirect that records every entry point it was sent to.
#[derive(Debug, Default)]
pub struct RecordingRedirect(Mutex<Vec<String>>);

impl RecordingRedirect {
    /// Entry points received so far.
    pub fn entries(&self) -> Vec<String> {
        lock(&self.0).clone()
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self, entry_point: &str) {
        lock(&self.0).push(entry_point.to_owned());
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixtureClock(pub DateTime<Utc>);

impl Default for FixtureClock {
    fn default() -> Self {
        match Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single() {
            Some(instant) => Self(instant),
            None => panic!("valid fixture timestamp"),
        }
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Everything a pipeline test needs to script and inspect.
pub struct PipelineHarness {
    /// Scripted transport.
    pub transport: Arc<ScriptedTransport>,
    /// Session storage.
    pub store: Arc<InMemorySessionStore>,
    /// Redirect recorder.
    pub redirect: Arc<RecordingRedirect>,
    /// Pipeline wired to the doubles above.
    pub pipeline: HttpPipeline,
}

impl PipelineHarness {
    /// Wire a pipeline over `transport` and `store`, redirecting to `/login`.
    pub fn new(transport: ScriptedTransport, store: InMemorySessionStore) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(store);
        let redirect = Arc::new(RecordingRedirect::default());
        let pipeline = HttpPipeline::new(
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(FixtureClock::default()),
        )
        .with_login_redirect(Arc::clone(&redirect) as Arc<dyn LoginRedirect>, "/login");
        Self {
            transport,
            store,
            redirect,
            pipeline,
        }
    }
}
