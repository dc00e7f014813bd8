//! Static header injection
//!
//! Adds configured headers (e.g. `Accept-Language`) to every call. Never
//! touches `Authorization`; that header belongs to `BearerAuth`.

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use serde::Deserialize;
use std::str::FromStr;
use tracing::warn;

use crate::error::Result;
use crate::interceptor::{InterceptFuture, Interceptor};
use crate::request::ApiRequest;

/// Header injection rule (name + value pair from config).
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Validated set of headers added to every request.
///
/// Invalid names/values and `Authorization` are dropped with a warning at
/// construction, so `prepare_request` cannot fail.
pub struct DefaultHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl DefaultHeaders {
    pub fn new(injections: &[HeaderInjection]) -> Self {
        let mut headers = Vec::with_capacity(injections.len());
        for injection in injections {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == AUTHORIZATION {
                warn!(header = %injection.name, "refusing to inject authorization header");
                continue;
            }
            let value = match HeaderValue::from_str(&injection.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.push((name, value));
        }
        Self { headers }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl Interceptor for DefaultHeaders {
    fn id(&self) -> &str {
        "default-headers"
    }

    fn prepare_request<'a>(
        &'a self,
        request: &'a mut ApiRequest,
    ) -> InterceptFuture<'a, Result<()>> {
        for (name, value) in &self.headers {
            // Per-call headers win over configured defaults
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        Box::pin(async { Ok(()) })
    }
}
