use crate::Route;

/// Errors raised by [`RouteGuard::protect`](crate::RouteGuard::protect).
///
/// Regular navigation never sees these: a refused navigation is a
/// redirect, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// The current session may not visit `path`.
    #[error("access denied to {path}, redirecting to {redirect_to}")]
    AccessDenied { path: String, redirect_to: Route },
}
