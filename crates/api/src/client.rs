//! Authenticated API client
//!
//! `ApiClient` runs each call through the interceptor pipeline: every
//! interceptor prepares the request, the transport sends it, and on failure
//! the interceptors are offered the error in order. The first one that asks
//! for a replay gets it sent exactly once; that outcome is final.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use storefront_session::{Credentials, DEFAULT_BASE_URL};
use tracing::{debug, instrument};

use crate::bearer::{BearerAuth, RefreshPolicy};
use crate::error::{Error, Result};
use crate::headers::{DefaultHeaders, HeaderInjection};
use crate::interceptor::{Interceptor, Recovery};
use crate::redirect::{LogRedirect, UnauthenticatedHandler};
use crate::request::{ApiRequest, ApiResponse, Encoding, RequestBody};
use crate::transport::Transport;

/// Client for the storefront REST backend.
///
/// Cheap to clone; clones share the connection pool and interceptors.
#[derive(Clone)]
pub struct ApiClient {
    transport: Transport,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ApiClient {
    pub fn new(transport: Transport, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            transport,
            interceptors,
        }
    }

    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Issue a call.
    ///
    /// `path` is relative to the base URL. `multipart` selects
    /// `multipart/form-data` instead of JSON and requires a form body (or
    /// none). Query parameters are URL-encoded and appended to the path.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        query: &[(&str, &str)],
        multipart: bool,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        request.encoding = if multipart {
            Encoding::Multipart
        } else {
            Encoding::Json
        };
        request.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.send(request).await
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse> {
        self.request(Method::GET, path, None, query, false).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<ApiResponse> {
        self.request(Method::POST, path, Some(RequestBody::Json(body)), &[], false)
            .await
    }

    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<ApiResponse> {
        self.request(Method::PUT, path, Some(RequestBody::Json(body)), &[], false)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.request(Method::DELETE, path, None, &[], false).await
    }

    /// Send a prepared request through the pipeline.
    #[instrument(skip_all, fields(request_id = %request.request_id, method = %request.method, path = %request.path))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        for interceptor in &self.interceptors {
            interceptor.prepare_request(&mut request).await?;
        }

        let mut error = match self.transport.send(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        for interceptor in &self.interceptors {
            match interceptor.recover(&request, error).await {
                Recovery::Retry(replay) => {
                    debug!(interceptor = interceptor.id(), "replaying request once");
                    return self.transport.send(&replay).await;
                }
                Recovery::Fail(e) => error = e,
            }
        }

        Err(error)
    }
}

/// Builder wiring the standard interceptors: configured default headers
/// first, then bearer auth when a session is attached.
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
    headers: Vec<HeaderInjection>,
    credentials: Option<Credentials>,
    on_unauthenticated: Arc<dyn UnauthenticatedHandler>,
    login_path: Option<String>,
    refresh_policy: RefreshPolicy,
    extra: Vec<Arc<dyn Interceptor>>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            headers: Vec::new(),
            credentials: None,
            on_unauthenticated: Arc::new(LogRedirect),
            login_path: None,
            refresh_policy: RefreshPolicy::default(),
            extra: Vec::new(),
        }
    }

    /// Per-request timeout. Without one the transport's default applies.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn headers(mut self, headers: Vec<HeaderInjection>) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a session: enables bearer injection and refresh-and-retry.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn on_unauthenticated(mut self, handler: Arc<dyn UnauthenticatedHandler>) -> Self {
        self.on_unauthenticated = handler;
        self
    }

    pub fn login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = Some(login_path.into());
        self
    }

    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Append a custom interceptor after the standard ones.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.extra.push(interceptor);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| Error::InvalidRequest(format!("building HTTP client: {e}")))?;

        let transport = Transport::new(http.clone(), self.base_url);
        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();

        let defaults = DefaultHeaders::new(&self.headers);
        if !defaults.is_empty() {
            interceptors.push(Arc::new(defaults));
        }

        if let Some(credentials) = self.credentials {
            let mut bearer = BearerAuth::new(
                credentials,
                http,
                transport.base_url(),
                self.on_unauthenticated,
            )
            .with_policy(self.refresh_policy);
            if let Some(login_path) = self.login_path {
                bearer = bearer.with_login_path(login_path);
            }
            interceptors.push(Arc::new(bearer));
        }

        interceptors.extend(self.extra);
        Ok(ApiClient::new(transport, interceptors))
    }
}
