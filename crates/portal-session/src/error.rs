//! Error types for the session layer.

use portal_store::StoreError;
use portal_token::TokenError;

/// Errors surfaced by the session manager.
///
/// Most failures never get this far: a missing or invalid token during
/// restore is just `false`, and event-log failures are swallowed. What is
/// left are the cases where a caller asked for a state change that could
/// not be applied. The session is then left exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token for a new session could not be issued.
    #[error("could not issue session token: {0}")]
    Token(#[from] TokenError),

    /// The new token could not be persisted.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// A zero-second inactivity window was requested.
    #[error("invalid session timeout: {0}s")]
    InvalidTimeout(u64),

    /// The session actor has been shut down.
    #[error("session manager is not running")]
    Closed,
}
