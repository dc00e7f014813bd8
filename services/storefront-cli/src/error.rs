//! CLI error types

use thiserror::Error;

/// Errors raised before any API call is made: configuration and argument
/// parsing. API failures surface as `storefront_api::Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    Argument(String),
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;
