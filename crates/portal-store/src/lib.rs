//! Persistence contracts for Portal Seguro.
//!
//! Provides the [`SessionStore`] and [`CredentialStore`] traits that the
//! session layer and the passkey flow persist through, plus
//! [`MemoryStore`], an in-process implementation of both.
//!
//! # Failure model
//!
//! Every method returns `Result<_, StoreError>`. Callers never let a store
//! error escape to the user: a failed token read degrades to "not
//! authenticated", a failed event write is dropped with a warning.

#![allow(async_fn_in_trait)]

mod credential;
mod error;
mod event;
mod memory;

pub use credential::{CredentialRecord, StoredCredential};
pub use error::StoreError;
pub use event::{EventKind, EventLogEntry, Metadata};
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

/// Durable key-value persistence for the session token and the
/// append-only security event log.
///
/// Holds at most one token: the token of the session this process would
/// resume on reload.
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the stored token if present and not yet expired.
    ///
    /// An expired token is purged as a side effect and `None` is returned.
    fn get_valid_token(
        &self,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Persists `token`, replacing any previous one, for `ttl`.
    fn store_token(
        &self,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the stored token regardless of its expiry.
    fn remove_token(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Purges the stored token if it has expired.
    fn clear_expired_tokens(
        &self,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends an entry to the event log. The store stamps the time.
    fn log_event(
        &self,
        kind: EventKind,
        actor: &str,
        metadata: Metadata,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Persistence for passkey credentials produced by the registration flow.
pub trait CredentialStore: Send + Sync + 'static {
    /// Stores a credential for `username`. A record with the same `id`
    /// replaces the earlier one.
    fn store_credential(
        &self,
        record: CredentialRecord,
        username: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every stored credential, oldest first.
    fn get_stored_credentials(
        &self,
    ) -> impl Future<Output = Result<Vec<StoredCredential>, StoreError>> + Send;

    /// Credentials registered for one user.
    fn credentials_for(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Vec<StoredCredential>, StoreError>> + Send;
}
