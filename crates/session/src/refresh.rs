//! Refresh-token exchange
//!
//! POSTs `{"token": <refresh>}` to `{base_url}/auth/refresh-token` and reads
//! the new access token back. The call goes straight through the given
//! `reqwest::Client`, never through the authenticated client pipeline, so a
//! 401 here cannot recurse into another refresh.

use serde::{Deserialize, Serialize};

use crate::constants::REFRESH_TOKEN_PATH;
use crate::error::{Error, Result};
use crate::token::Token;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    token: &'a str,
}

/// Token fields as the backend returns them. They appear either at the top
/// level or wrapped in the usual `{"data": {...}}` envelope.
#[derive(Debug, Default, Deserialize)]
struct TokenFields {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(flatten)]
    top: TokenFields,
    #[serde(default)]
    data: Option<TokenFields>,
}

/// Tokens issued by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access: Token,
    /// Present only when the backend rotates refresh tokens
    pub refresh: Option<Token>,
}

/// Exchange a refresh token for a new access token.
///
/// 401/403 from the refresh endpoint mean the refresh token itself is dead
/// (`InvalidCredentials`); other non-2xx statuses are `TokenExchange`;
/// connection failures and timeouts are `Http`.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &Token,
) -> Result<RefreshedTokens> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), REFRESH_TOKEN_PATH);

    let response = client
        .post(&url)
        .json(&RefreshRequest {
            token: refresh.expose(),
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    let parsed = response
        .json::<RefreshResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))?;

    let data = parsed.data.unwrap_or_default();
    let access = Token::from_stored(parsed.top.access_token.or(data.access_token))
        .ok_or_else(|| Error::TokenExchange("refresh response has no access_token".into()))?;
    let refresh = Token::from_stored(parsed.top.refresh_token.or(data.refresh_token));

    Ok(RefreshedTokens { access, refresh })
}
