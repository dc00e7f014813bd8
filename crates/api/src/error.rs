//! Error types for API calls

use reqwest::StatusCode;

/// Errors surfaced to callers of `ApiClient`.
///
/// Only `Status` with a 401 is ever recovered from, and only once per call;
/// everything else reaches the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("token refresh failed: {0}")]
    Refresh(#[source] storefront_session::Error),

    #[error("session store error: {0}")]
    Session(#[from] storefront_session::Error),

    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("token not received: {0}")]
    TokenNotReceived(String),
}

impl Error {
    /// HTTP status of a backend error response, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend answered 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport { timeout: true, .. })
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Error::Transport {
            timeout: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Result alias for API calls.
pub type Result<T> = std::result::Result<T, Error>;
