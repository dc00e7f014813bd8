//! Interceptor pipeline stage
//!
//! An interceptor sees each call twice: before it is sent
//! (`prepare_request`) and, if it failed, after (`recover`). A recovering
//! interceptor hands back a replay; the client sends that replay exactly once
//! and returns its outcome as-is, so no call is ever retried twice.

use std::future::Future;
use std::pin::Pin;

use crate::error::{Error, Result};
use crate::request::ApiRequest;

/// Boxed future returned by interceptor hooks.
pub type InterceptFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of `Interceptor::recover`.
#[derive(Debug)]
pub enum Recovery {
    /// Reissue this request once; its result goes straight to the caller.
    Retry(ApiRequest),
    /// Not recoverable here; the next interceptor gets this error.
    Fail(Error),
}

/// Hook into every call made by `ApiClient`.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Interceptor>`).
pub trait Interceptor: Send + Sync {
    /// Identifier for logging
    fn id(&self) -> &str;

    /// Mutate the request before its first send.
    fn prepare_request<'a>(
        &'a self,
        request: &'a mut ApiRequest,
    ) -> InterceptFuture<'a, Result<()>>;

    /// Offered a failed call. The default passes the error on.
    fn recover<'a>(
        &'a self,
        _request: &'a ApiRequest,
        error: Error,
    ) -> InterceptFuture<'a, Recovery> {
        Box::pin(async move { Recovery::Fail(error) })
    }
}
