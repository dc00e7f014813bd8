//! Bearer token injection with one-shot refresh-and-retry
//!
//! Before each call the current access token is read from the credential
//! store and attached as `Authorization: Bearer <token>`; without a token the
//! call goes out unauthenticated.
//!
//! Recovery runs only for 401 responses:
//! 1. No refresh token: clear the session, notify the unauthenticated
//!    handler, fail with the original 401.
//! 2. Refresh token present: exchange it at `/auth/refresh-token`.
//!    - success: store the new access token and replay the original request
//!      once with it; whatever the replay returns goes to the caller.
//!    - failure: clear the session, notify the handler, fail with the
//!      refresh error.
//!
//! Everything else (other statuses, timeouts, connection errors) passes
//! through untouched.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use storefront_session::{Credentials, DEFAULT_LOGIN_PATH, Token, refresh_access_token};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::interceptor::{InterceptFuture, Interceptor, Recovery};
use crate::metrics;
use crate::redirect::UnauthenticatedHandler;
use crate::request::ApiRequest;

/// How concurrent 401s share refresh-token exchanges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Every failed call runs its own exchange.
    #[default]
    PerRequest,
    /// Exchanges are serialized; a caller whose token was already replaced
    /// while it waited reuses the stored token instead of refreshing again.
    SingleFlight,
}

/// Stored access token relative to the one a failed request carried.
enum StoredToken {
    Unchanged,
    /// A concurrent call refreshed it.
    Replaced(Token),
    /// A concurrent call ended the session.
    Ended,
}

/// Interceptor owning the `Authorization` header.
pub struct BearerAuth {
    credentials: Credentials,
    http: reqwest::Client,
    base_url: String,
    login_path: String,
    on_unauthenticated: Arc<dyn UnauthenticatedHandler>,
    policy: RefreshPolicy,
    /// Serializes single-flight exchanges; holds the last failed exchange's
    /// error for callers that waited on it.
    refresh_lock: Mutex<Option<storefront_session::Error>>,
}

impl BearerAuth {
    /// `http` is used for the refresh exchange only; it bypasses the
    /// interceptor pipeline so a 401 from the refresh endpoint cannot recurse.
    pub fn new(
        credentials: Credentials,
        http: reqwest::Client,
        base_url: impl Into<String>,
        on_unauthenticated: Arc<dyn UnauthenticatedHandler>,
    ) -> Self {
        Self {
            credentials,
            http,
            base_url: base_url.into(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            on_unauthenticated,
            policy: RefreshPolicy::default(),
            refresh_lock: Mutex::new(None),
        }
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn recover_unauthorized(&self, request: &ApiRequest, error: Error) -> Recovery {
        let mut flight = match self.policy {
            RefreshPolicy::SingleFlight => Some(self.refresh_lock.lock().await),
            RefreshPolicy::PerRequest => None,
        };

        if let Some(last_failure) = flight.as_deref() {
            match self.stored_token_state(request).await {
                StoredToken::Replaced(current) => {
                    debug!("access token already refreshed by a concurrent call");
                    metrics::record_refresh("reused");
                    return match with_bearer(request, &current) {
                        Ok(replay) => Recovery::Retry(replay),
                        Err(e) => Recovery::Fail(e),
                    };
                }
                StoredToken::Ended => {
                    debug!("session already ended by a concurrent call");
                    return Recovery::Fail(match last_failure {
                        Some(e) => Error::Refresh(e.clone()),
                        None => error,
                    });
                }
                StoredToken::Unchanged => {}
            }
        }
        if let Some(last_failure) = flight.as_deref_mut() {
            *last_failure = None;
        }

        let refresh = match self.credentials.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("401 without a refresh token, ending session");
                self.end_session().await;
                return Recovery::Fail(error);
            }
            Err(e) => {
                warn!(error = %e, "could not read refresh token, ending session");
                self.end_session().await;
                return Recovery::Fail(error);
            }
        };

        let outcome = self.exchange(&refresh).await;
        if let (Some(last_failure), Err(Error::Refresh(e))) = (flight.as_deref_mut(), &outcome) {
            *last_failure = Some(e.clone());
        }

        match outcome {
            Ok(access) => match with_bearer(request, &access) {
                Ok(replay) => {
                    debug!("replaying request with refreshed token");
                    Recovery::Retry(replay)
                }
                Err(e) => Recovery::Fail(e),
            },
            Err(e) => {
                warn!(error = %e, "token refresh failed, ending session");
                self.end_session().await;
                Recovery::Fail(e)
            }
        }
    }

    /// Compare the stored access token with the one the failed request
    /// carried.
    async fn stored_token_state(&self, request: &ApiRequest) -> StoredToken {
        let Ok(current) = self.credentials.access_token().await else {
            return StoredToken::Unchanged;
        };
        match (current, request.bearer_token()) {
            (Some(current), Some(sent)) if sent == current.expose() => StoredToken::Unchanged,
            (Some(current), _) => StoredToken::Replaced(current),
            (None, Some(_)) => StoredToken::Ended,
            (None, None) => StoredToken::Unchanged,
        }
    }

    /// Run the refresh exchange and persist the result.
    async fn exchange(&self, refresh: &Token) -> Result<Token> {
        let tokens = match refresh_access_token(&self.http, &self.base_url, refresh).await {
            Ok(tokens) => tokens,
            Err(e) => {
                metrics::record_refresh(if e.is_rejected() { "rejected" } else { "failed" });
                return Err(Error::Refresh(e));
            }
        };

        self.credentials
            .store_tokens(&tokens.access, tokens.refresh.as_ref())
            .await?;

        metrics::record_refresh("success");
        info!(rotated_refresh = tokens.refresh.is_some(), "access token refreshed");
        Ok(tokens.access)
    }

    /// Purge credentials and send the user to the login path.
    async fn end_session(&self) {
        if let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "failed to clear credentials");
        }
        metrics::record_unauthenticated();
        self.on_unauthenticated.on_unauthenticated(&self.login_path);
    }
}

impl Interceptor for BearerAuth {
    fn id(&self) -> &str {
        "bearer-auth"
    }

    fn prepare_request<'a>(
        &'a self,
        request: &'a mut ApiRequest,
    ) -> InterceptFuture<'a, Result<()>> {
        Box::pin(async move {
            request.headers.remove(AUTHORIZATION);
            if let Some(token) = self.credentials.access_token().await? {
                request.headers.insert(AUTHORIZATION, bearer_value(&token)?);
                debug!("attached bearer token");
            }
            Ok(())
        })
    }

    fn recover<'a>(
        &'a self,
        request: &'a ApiRequest,
        error: Error,
    ) -> InterceptFuture<'a, Recovery> {
        Box::pin(async move {
            if !error.is_unauthorized() {
                return Recovery::Fail(error);
            }
            self.recover_unauthorized(request, error).await
        })
    }
}

fn bearer_value(token: &Token) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&token.bearer())
        .map_err(|e| Error::InvalidRequest(format!("access token is not a valid header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Copy of `request` carrying `token`.
fn with_bearer(request: &ApiRequest, token: &Token) -> Result<ApiRequest> {
    let mut replay = request.clone();
    replay.headers.insert(AUTHORIZATION, bearer_value(token)?);
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockBackend, RecordingRedirect, Reply};
    use storefront_session::MemoryStore;

    fn credentials(entries: &[(&str, &str)]) -> Credentials {
        Credentials::new(Arc::new(MemoryStore::with_entries(
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )))
    }

    fn unauthorized() -> Error {
        Error::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "expired".into(),
        }
    }

    #[tokio::test]
    async fn prepare_attaches_stored_token() {
        let auth = BearerAuth::new(
            credentials(&[("authToken", "at_1")]),
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Arc::new(|_: &str| {}),
        );
        let mut request = ApiRequest::get("/me");
        auth.prepare_request(&mut request).await.unwrap();

        let value = request.headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value, "Bearer at_1");
        assert!(value.is_sensitive());
    }

    #[tokio::test]
    async fn prepare_without_token_sends_no_authorization() {
        let auth = BearerAuth::new(
            credentials(&[]),
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Arc::new(|_: &str| {}),
        );
        let mut request = ApiRequest::get("/products")
            .header("authorization", "Bearer stale")
            .unwrap();
        auth.prepare_request(&mut request).await.unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn non_401_is_passed_through_without_refresh() {
        let backend = MockBackend::start().await;
        let redirect = Arc::new(RecordingRedirect::default());
        let auth = BearerAuth::new(
            credentials(&[("authToken", "at"), ("refreshToken", "rt")]),
            reqwest::Client::new(),
            backend.base_url(),
            redirect.clone(),
        );

        let err = Error::Status {
            status: reqwest::StatusCode::FORBIDDEN,
            body: String::new(),
        };
        let recovery = auth.recover(&ApiRequest::get("/admin"), err).await;
        assert!(matches!(recovery, Recovery::Fail(Error::Status { .. })));
        assert!(backend.requests().is_empty(), "no refresh call expected");
        assert!(redirect.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_refresh_yields_replay_with_new_token() {
        let backend = MockBackend::start().await;
        backend.reply(
            "/auth/refresh-token",
            Reply::json(serde_json::json!({"access_token": "at_new"})),
        );
        let creds = credentials(&[("authToken", "at_old"), ("refreshToken", "rt_1")]);
        let redirect = Arc::new(RecordingRedirect::default());
        let auth = BearerAuth::new(
            creds.clone(),
            reqwest::Client::new(),
            backend.base_url(),
            redirect.clone(),
        );

        let request = ApiRequest::get("/orders")
            .header("authorization", "Bearer at_old")
            .unwrap();
        let replay = match auth.recover(&request, unauthorized()).await {
            Recovery::Retry(replay) => replay,
            Recovery::Fail(e) => panic!("expected retry, got {e}"),
        };

        assert_eq!(replay.bearer_token(), Some("at_new"));
        assert_eq!(replay.request_id, request.request_id);
        assert!(redirect.calls().is_empty());
        assert_eq!(creds.access_token().await.unwrap(), Some(Token::new("at_new")));
        assert_eq!(creds.refresh_token().await.unwrap(), Some(Token::new("rt_1")));

        let refreshes = backend.requests_to("/auth/refresh-token");
        assert_eq!(refreshes.len(), 1);
        let body: serde_json::Value = serde_json::from_str(&refreshes[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"token": "rt_1"}));
    }

    #[tokio::test]
    async fn single_flight_reuses_token_replaced_while_waiting() {
        let backend = MockBackend::start().await;
        let creds = credentials(&[("authToken", "at_fresh"), ("refreshToken", "rt")]);
        let auth = BearerAuth::new(
            creds,
            reqwest::Client::new(),
            backend.base_url(),
            Arc::new(|_: &str| {}),
        )
        .with_policy(RefreshPolicy::SingleFlight);

        // The failed request carried an older token than the one now stored
        let request = ApiRequest::get("/cart")
            .header("authorization", "Bearer at_stale")
            .unwrap();
        match auth.recover(&request, unauthorized()).await {
            Recovery::Retry(replay) => assert_eq!(replay.bearer_token(), Some("at_fresh")),
            Recovery::Fail(e) => panic!("expected retry, got {e}"),
        }
        assert!(backend.requests_to("/auth/refresh-token").is_empty());
    }

    #[tokio::test]
    async fn per_request_policy_refreshes_even_if_token_changed() {
        let backend = MockBackend::start().await;
        backend.reply(
            "/auth/refresh-token",
            Reply::json(serde_json::json!({"access_token": "at_new"})),
        );
        let auth = BearerAuth::new(
            credentials(&[("authToken", "at_fresh"), ("refreshToken", "rt")]),
            reqwest::Client::new(),
            backend.base_url(),
            Arc::new(|_: &str| {}),
        );
        assert_eq!(auth.policy(), RefreshPolicy::PerRequest);

        let request = ApiRequest::get("/cart")
            .header("authorization", "Bearer at_stale")
            .unwrap();
        assert!(matches!(
            auth.recover(&request, unauthorized()).await,
            Recovery::Retry(_)
        ));
        assert_eq!(backend.requests_to("/auth/refresh-token").len(), 1);
    }

    #[test]
    fn refresh_policy_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: RefreshPolicy,
        }
        let w: Wrapper = serde_json::from_str(r#"{"policy":"single_flight"}"#).unwrap();
        assert_eq!(w.policy, RefreshPolicy::SingleFlight);
        let w: Wrapper = serde_json::from_str(r#"{"policy":"per_request"}"#).unwrap();
        assert_eq!(w.policy, RefreshPolicy::PerRequest);
        assert!(serde_json::from_str::<Wrapper>(r#"{"policy":"coalesce"}"#).is_err());
    }
}
