//! In-process mock backend for client tests
//!
//! Serves every path under `/api/v1`, records each request, and answers from
//! per-path scripted replies. A scripted sequence is consumed one reply per
//! call; its last reply then repeats.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;

use crate::redirect::UnauthenticatedHandler;

const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: value.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn unauthorized() -> Self {
        Self::status(StatusCode::UNAUTHORIZED, r#"{"message":"token expired"}"#)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Unauthenticated handler that remembers every redirect.
#[derive(Default)]
pub struct RecordingRedirect {
    calls: Mutex<Vec<String>>,
}

impl RecordingRedirect {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl UnauthenticatedHandler for RecordingRedirect {
    fn on_unauthenticated(&self, redirect_to: &str) {
        self.calls.lock().unwrap().push(redirect_to.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn authorization(&self) -> Option<String> {
        self.header("authorization")
    }
}

#[derive(Default)]
struct Inner {
    requests: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
}

impl Inner {
    async fn handle(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, 16 * 1024 * 1024)
            .await
            .unwrap_or_default();
        let path = parts.uri.path().to_string();

        self.requests.lock().unwrap().push(RecordedRequest {
            method: parts.method.to_string(),
            path: path.clone(),
            query: parts.uri.query().unwrap_or("").to_string(),
            headers: parts
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&path) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        }
        .unwrap_or_else(|| Reply::json(serde_json::json!({"ok": true})));

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        (
            reply.status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            reply.body,
        )
            .into_response()
    }
}

pub struct MockBackend {
    addr: SocketAddr,
    inner: Arc<Inner>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let inner = Arc::new(Inner::default());

        let state = inner.clone();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(move |request: Request<Body>| {
                let state = state.clone();
                async move { state.handle(request).await }
            });
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, inner }
    }

    /// API base URL, e.g. `http://127.0.0.1:PORT/api/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}{API_PREFIX}", self.addr)
    }

    /// Answer `path` (relative to the base URL) with `reply` on every call.
    pub fn reply(&self, path: &str, reply: Reply) {
        self.reply_sequence(path, vec![reply]);
    }

    /// Answer successive calls to `path` with `replies` in order.
    pub fn reply_sequence(&self, path: &str, replies: Vec<Reply>) {
        self.inner
            .replies
            .lock()
            .unwrap()
            .insert(format!("{API_PREFIX}{path}"), replies.into());
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    /// Requests received for `path` (relative to the base URL).
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("{API_PREFIX}{path}");
        self.requests()
            .into_iter()
            .filter(|r| r.path == full)
            .collect()
    }
}
