//! Error types for session operations

/// Errors from credential storage and token exchange.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl Error {
    /// Whether the backend rejected the refresh token itself (as opposed to a
    /// transport or parse failure).
    pub fn is_rejected(&self) -> bool {
        matches!(self, Error::InvalidCredentials(_))
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
