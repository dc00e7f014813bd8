//! Authenticated HTTP client for the storefront REST backend
//!
//! Every call goes through a small interceptor pipeline:
//! 1. `prepare_request` on each interceptor (static headers, bearer token)
//! 2. the transport sends the request against the configured base URL
//! 3. on failure, each interceptor in turn may ask for a single replay
//!
//! `BearerAuth` is the interceptor that attaches `Authorization: Bearer ...`
//! from the credential store and, on a 401, exchanges the refresh token and
//! replays the original request exactly once. `AuthApi` layers the login,
//! OTP and logout endpoints on top of the client.

pub mod auth;
pub mod bearer;
pub mod client;
pub mod error;
pub mod headers;
pub mod interceptor;
pub mod metrics;
pub mod redirect;
pub mod request;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use auth::{AuthApi, AuthSession, LoginOutcome};
pub use bearer::{BearerAuth, RefreshPolicy};
pub use client::{ApiClient, ApiClientBuilder};
pub use error::{Error, Result};
pub use headers::{DefaultHeaders, HeaderInjection};
pub use interceptor::{InterceptFuture, Interceptor, Recovery};
pub use redirect::{LogRedirect, UnauthenticatedHandler};
pub use request::{ApiRequest, ApiResponse, Encoding, FormPart, PartValue, RequestBody};
pub use transport::Transport;
