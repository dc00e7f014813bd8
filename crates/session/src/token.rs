//! Redacted token wrapper

use std::fmt;
use zeroize::Zeroize;

/// An access or refresh token.
///
/// Redacted in Debug/Display so it never reaches logs, and zeroed on drop.
/// Use `expose()` only where the raw value goes on the wire or into the store.
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for this token
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Parse a stored value. Empty strings count as "no token", matching how
    /// the web app treats a blank `authToken` entry.
    pub fn from_stored(value: Option<String>) -> Option<Self> {
        value.filter(|v| !v.is_empty()).map(Self)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Token {}

impl Clone for Token {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token([REDACTED])")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_in_debug_and_display() {
        let token = Token::new("at_secret_value");
        assert_eq!(format!("{token:?}"), "Token([REDACTED])");
        assert_eq!(token.to_string(), "[REDACTED]");
    }

    #[test]
    fn bearer_formats_header_value() {
        let token = Token::new("abc.def.ghi");
        assert_eq!(token.bearer(), "Bearer abc.def.ghi");
        assert_eq!(token.expose(), "abc.def.ghi");
    }

    #[test]
    fn empty_stored_value_is_no_token() {
        assert!(Token::from_stored(None).is_none());
        assert!(Token::from_stored(Some(String::new())).is_none());
        assert_eq!(
            Token::from_stored(Some("at_1".into())),
            Some(Token::new("at_1"))
        );
    }
}
