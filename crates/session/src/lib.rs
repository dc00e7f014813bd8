//! Session credentials for the storefront API client
//!
//! Owns everything the client needs to know about "who is logged in":
//! the credential store abstraction, the access/refresh token pair kept in
//! it, the refresh-token exchange against the backend, and JWT claims
//! decoding for local session checks. This crate has no dependency on the
//! HTTP client crate, so stores can be swapped and tested independently.
//!
//! Credential flow:
//! 1. Login stores `authToken` + `refreshToken` via `Credentials::store_tokens()`
//! 2. Every request reads the access token via `Credentials::access_token()`
//! 3. On 401 the client calls `refresh::refresh_access_token()`
//! 4. The new access token is saved via `Credentials::set_access_token()`
//! 5. Logout or an unrecoverable refresh failure calls `Credentials::clear()`

pub mod claims;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod store;
pub mod token;

pub use claims::Claims;
pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use refresh::{RefreshedTokens, refresh_access_token};
pub use store::{CredentialStore, FileStore, MemoryStore, StoreFuture};
pub use token::Token;
