//! Login, two-factor verification and session introspection
//!
//! Endpoints answer with the backend envelope `{"message": ..., "data": {...}}`.
//! Tokens found under `data` are written to the credential store so that
//! subsequent `ApiClient` calls pick them up.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use storefront_session::{Claims, Credentials, Token, refresh_access_token};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::redirect::UnauthenticatedHandler;
use crate::request::ApiResponse;

const LOGIN_PATH: &str = "/auth/authenticate";
const VERIFY_OTP_PATH: &str = "/auth/verify-otp";
const SOCIAL_LOGIN_PATH: &str = "/auth/social-login";

/// Where the user lands after an explicit logout
const LOGOUT_REDIRECT: &str = "/";

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<SessionData>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionData {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default, rename = "requireTwoFactor")]
    require_two_factor: bool,
}

/// A stored session after a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: Option<Value>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(AuthSession),
    /// The backend sent a one-time code; finish with `AuthApi::verify_otp`.
    TwoFactorRequired {
        email: String,
        message: Option<String>,
    },
}

#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
    credentials: Credentials,
    on_unauthenticated: Arc<dyn UnauthenticatedHandler>,
}

impl AuthApi {
    /// `credentials` must be the store the client's bearer interceptor reads.
    pub fn new(
        client: ApiClient,
        credentials: Credentials,
        on_unauthenticated: Arc<dyn UnauthenticatedHandler>,
    ) -> Self {
        Self {
            client,
            credentials,
            on_unauthenticated,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let response = self
            .client
            .post(LOGIN_PATH, json!({"email": email, "password": password}))
            .await?;
        let envelope: Envelope = response.json()?;
        let message = envelope.message;
        let data = envelope.data.unwrap_or_default();

        if data.require_two_factor {
            info!("login requires two-factor verification");
            return Ok(LoginOutcome::TwoFactorRequired {
                email: email.to_string(),
                message,
            });
        }

        if data.access_token.as_deref().is_none_or(str::is_empty) {
            return Err(Error::TokenNotReceived(
                message.unwrap_or_else(|| "login response carried no access token".into()),
            ));
        }

        let user = data.user.clone();
        self.store_session(data).await?;
        info!("logged in");
        Ok(LoginOutcome::Authenticated(AuthSession { user, message }))
    }

    /// Complete a two-factor login. Returns the raw response body.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<Value> {
        let response = self
            .client
            .post(VERIFY_OTP_PATH, json!({"email": email, "otp": otp}))
            .await?;
        self.store_if_present(&response).await
    }

    /// Log in with a third-party identity payload. Returns the envelope's
    /// `data` object (`null` when absent).
    pub async fn social_login(&self, payload: Value) -> Result<Value> {
        let response = self.client.post(SOCIAL_LOGIN_PATH, payload).await?;
        let mut body = self.store_if_present(&response).await?;
        Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }

    /// Drop the local session. The backend keeps no session state to revoke.
    pub async fn logout(&self) -> Result<()> {
        self.credentials.clear().await?;
        info!("logged out");
        self.on_unauthenticated.on_unauthenticated(LOGOUT_REDIRECT);
        Ok(())
    }

    /// A stored access token exists and, if it carries an expiry, it has not
    /// passed. Tokens that are not JWTs count as valid.
    pub async fn is_authenticated(&self) -> Result<bool> {
        let Some(token) = self.credentials.access_token().await? else {
            return Ok(false);
        };
        Ok(match Claims::decode(token.expose()) {
            Ok(claims) => !claims.is_expired(),
            Err(_) => true,
        })
    }

    pub async fn is_admin(&self) -> Result<bool> {
        let Some(token) = self.credentials.access_token().await? else {
            return Ok(false);
        };
        Ok(Claims::decode(token.expose()).is_ok_and(|claims| claims.is_admin()))
    }

    pub async fn current_user(&self) -> Result<Option<Value>> {
        Ok(self.credentials.user().await?)
    }

    /// Exchange the stored refresh token now, without waiting for a 401.
    pub async fn refresh(&self) -> Result<()> {
        let refresh = self
            .credentials
            .refresh_token()
            .await?
            .ok_or(Error::NoRefreshToken)?;
        let transport = self.client.transport();
        let tokens = refresh_access_token(transport.http_client(), transport.base_url(), &refresh)
            .await
            .map_err(Error::Refresh)?;
        self.credentials
            .store_tokens(&tokens.access, tokens.refresh.as_ref())
            .await?;
        info!("access token refreshed");
        Ok(())
    }

    async fn store_if_present(&self, response: &ApiResponse) -> Result<Value> {
        let body = response.data()?;
        let envelope: Envelope = serde_json::from_value(body.clone()).unwrap_or_default();
        let issued = envelope
            .data
            .filter(|data| data.access_token.as_deref().is_some_and(|t| !t.is_empty()));
        if let Some(data) = issued {
            self.store_session(data).await?;
        }
        Ok(body)
    }

    /// Replace whatever session was stored with the one just issued.
    async fn store_session(&self, data: SessionData) -> Result<()> {
        let Some(access) = data.access_token.map(Token::new) else {
            return Ok(());
        };
        self.credentials.clear().await?;
        let refresh = data.refresh_token.filter(|t| !t.is_empty()).map(Token::new);
        if refresh.is_none() {
            warn!("session issued without a refresh token");
        }
        self.credentials
            .store_tokens(&access, refresh.as_ref())
            .await?;
        if let Some(user) = &data.user {
            self.credentials.store_user(user).await?;
        }
        Ok(())
    }
}
