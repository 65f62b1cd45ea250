//! Driven port for sending the user back to the login entry point after an
//! unrecoverable authorization failure.

use tracing::warn;

/// Navigation hook invoked once the pipeline has cleared stored credentials.
pub trait LoginRedirect: Send + Sync {
    /// Send the user to `entry_point`.
    fn redirect_to_login(&self, entry_point: &str);
}

/// Redirect that only records the event in the log.
///
/// Suits headless front ends, where the next command simply finds no session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLoginRedirect;

impl LoginRedirect for TracingLoginRedirect {
    fn redirect_to_login(&self, entry_point: &str) {
        warn!(entry_point, "session expired; login required");
    }
}
