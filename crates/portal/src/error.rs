//! Unified error type for Portal Seguro.

use portal_guard::GuardError;
use portal_session::SessionError;
use portal_store::StoreError;
use portal_token::TokenError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// A token could not be issued or was rejected.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session manager refused or could not apply a change.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A route was refused by [`RouteGuard::protect`](portal_guard::RouteGuard::protect).
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The builder was given an unusable setting.
    #[error("invalid configuration: {0}")]
    Config(String),
}
