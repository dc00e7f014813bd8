//! JWT claims decoding for local session checks
//!
//! Reads the payload segment of an access token without verifying the
//! signature. The backend is the only party that trusts these claims; the
//! client uses them for UX decisions (is the session expired, is the user an
//! admin) and nothing else.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Role value the backend assigns to back-office users
pub const ADMIN_ROLE: &str = "ADMIN";

/// Claims carried in a storefront access token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration as unix timestamp in seconds
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub iat: Option<u64>,
}

impl Claims {
    /// Decode the payload of a `header.payload.signature` token.
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(Error::InvalidToken(
                    "expected three dot-separated segments".into(),
                ));
            }
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("payload is not base64url: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("payload is not a claims object: {e}")))
    }

    /// Whether the token is expired at `now_secs`. Tokens without `exp` never
    /// expire locally; the backend still has the final word.
    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }

    /// Whether the token is expired now.
    pub fn is_expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.is_expired_at(now)
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}
