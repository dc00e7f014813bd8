//! Unauthenticated handler
//!
//! Stands in for the browser navigation the web app performs when the
//! session is lost. The client only reports the login path; what "going
//! there" means is up to the host application.

use tracing::warn;

/// Called when a session cannot be recovered (no refresh token, refresh
/// rejected) and on explicit logout.
pub trait UnauthenticatedHandler: Send + Sync {
    fn on_unauthenticated(&self, redirect_to: &str);
}

impl<F> UnauthenticatedHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_unauthenticated(&self, redirect_to: &str) {
        self(redirect_to)
    }
}

/// Handler for headless hosts: logs and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl UnauthenticatedHandler for LogRedirect {
    fn on_unauthenticated(&self, redirect_to: &str) {
        warn!(redirect_to, "session ended, login required");
    }
}
