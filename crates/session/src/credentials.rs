//! Typed access to the session keys of a `CredentialStore`

use std::sync::Arc;

use tracing::debug;

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};
use crate::error::{Error, Result};
use crate::store::CredentialStore;
use crate::token::Token;

/// Session view over a shared credential store.
///
/// Cheap to clone; every clone reads and writes the same store.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Current access token, if logged in.
    pub async fn access_token(&self) -> Result<Option<Token>> {
        Ok(Token::from_stored(self.store.get(ACCESS_TOKEN_KEY).await?))
    }

    /// Current refresh token, if any.
    pub async fn refresh_token(&self) -> Result<Option<Token>> {
        Ok(Token::from_stored(self.store.get(REFRESH_TOKEN_KEY).await?))
    }

    /// Replace the access token (after a refresh).
    pub async fn set_access_token(&self, token: &Token) -> Result<()> {
        self.store
            .set(ACCESS_TOKEN_KEY, token.expose().to_string())
            .await
    }

    /// Store a freshly issued token pair. A missing refresh token leaves the
    /// stored one untouched.
    pub async fn store_tokens(&self, access: &Token, refresh: Option<&Token>) -> Result<()> {
        self.set_access_token(access).await?;
        if let Some(refresh) = refresh {
            self.store
                .set(REFRESH_TOKEN_KEY, refresh.expose().to_string())
                .await?;
        }
        debug!(rotated_refresh = refresh.is_some(), "stored session tokens");
        Ok(())
    }

    /// Store the user profile returned at login.
    pub async fn store_user(&self, user: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(user)
            .map_err(|e| Error::CredentialParse(format!("serializing user data: {e}")))?;
        self.store.set(USER_DATA_KEY, json).await
    }

    /// Stored user profile, if any.
    pub async fn user(&self) -> Result<Option<serde_json::Value>> {
        match self.store.get(USER_DATA_KEY).await? {
            Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::CredentialParse(format!("parsing user data: {e}"))),
            _ => Ok(None),
        }
    }

    /// Remove every session key.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
