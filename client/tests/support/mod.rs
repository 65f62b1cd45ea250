//! Shared helpers for client integration tests.
//!
//! Integration tests compile as separate crates under `client/tests/`, so the
//! HTTP stub lives here rather than behind the `test-support` feature: it
//! only makes sense against the real `reqwest` transport.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including any query string.
    pub target: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Minimal HTTP/1.1 server answering from a FIFO script.
///
/// Every connection carries one request and is closed after the reply, so the
/// script order matches the order the client sends in. An exhausted script
/// answers `500`.
pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Bind to an ephemeral port and start serving `replies` in order.
    pub async fn start(replies: Vec<(u16, Value)>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(serve(
            listener,
            VecDeque::from(replies),
            Arc::clone(&requests),
        ));
        Ok(Self {
            base_url: format!("http://{addr}/api/v1"),
            requests,
            task,
        })
    }

    /// API root including the `/api/v1` prefix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests served so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("stub request log").clone()
    }

    /// `Authorization` header of each request served so far.
    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.requests()
            .into_iter()
            .map(|request| request.authorization)
            .collect()
    }

    /// Request targets served so far.
    pub fn targets(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.target)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Return a local URL nothing is listening on.
pub async fn unreachable_base_url() -> io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api/v1"))
}

async fn serve(
    listener: TcpListener,
    mut replies: VecDeque<(u16, Value)>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    while let Ok((mut socket, _)) = listener.accept().await {
        let Ok(request) = read_request(&mut socket).await else {
            continue;
        };
        requests.lock().expect("stub request log").push(request);
        let (status, body) = replies
            .pop_front()
            .unwrap_or_else(|| (500, serde_json::json!({ "message": "stub script exhausted" })));
        write_response(&mut socket, status, &body).await.ok();
    }
}

async fn read_request(socket: &mut TcpStream) -> io::Result<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let header_len = loop {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "headers truncated"));
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(HEADER_END.len()).position(|w| w == HEADER_END) {
            break pos + HEADER_END.len();
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_len]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_owned();
    let target = request_line.next().unwrap_or_default().to_owned();

    let mut authorization = None;
    let mut content_length = 0_usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("authorization") {
            authorization = Some(value.to_owned());
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or_default();
        }
    }

    while buffer.len() < header_len + content_length {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body_end = buffer.len().min(header_len + content_length);
    let body = String::from_utf8_lossy(&buffer[header_len..body_end]).into_owned();

    Ok(RecordedRequest {
        method,
        target,
        authorization,
        body,
    })
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &Value) -> io::Result<()> {
    let payload = body.to_string();
    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
