//! In-process store: the default backend, and the one tests run against.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use portal_token::Clock;
use tokio::sync::Mutex;

use crate::{
    CredentialRecord, CredentialStore, EventKind, EventLogEntry, Metadata,
    SessionStore, StoreError, StoredCredential,
};

#[derive(Debug, Clone)]
struct StoredToken {
    value: String,
    /// Unix seconds; the token is readable up to and including this second.
    expires_at: u64,
}

#[derive(Debug, Default)]
struct Inner {
    token: Option<StoredToken>,
    events: Vec<EventLogEntry>,
    credentials: Vec<StoredCredential>,
}

/// [`SessionStore`] + [`CredentialStore`] kept in memory.
///
/// Expiry is measured on the injected [`Clock`], the same one the token
/// codec uses, so a token and its storage slot age together.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            available: AtomicBool::new(true),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Simulates the backing storage going away (`false`) or coming back.
    /// While unavailable every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of the whole event log, oldest first.
    pub async fn events(&self) -> Vec<EventLogEntry> {
        self.inner.lock().await.events.clone()
    }

    /// Snapshot of the log entries of one kind.
    pub async fn events_of(&self, kind: EventKind) -> Vec<EventLogEntry> {
        self.inner
            .lock()
            .await
            .events
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Drops log entries older than `retention`. Returns how many went.
    ///
    /// This is the only way an entry ever leaves the log.
    pub async fn sweep_events(&self, retention: Duration) -> usize {
        let cutoff = self.timestamp_at(
            self.clock
                .now_unix()
                .saturating_sub(retention.as_secs()),
        );
        let mut inner = self.inner.lock().await;
        let before = inner.events.len();
        inner.events.retain(|e| e.timestamp >= cutoff);
        let removed = before - inner.events.len();
        if removed > 0 {
            tracing::debug!(removed, "swept expired event log entries");
        }
        removed
    }

    fn check_available(&self, op: &str) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("{op}: storage offline")))
        }
    }

    fn timestamp_at(&self, unix: u64) -> DateTime<Utc> {
        DateTime::from_timestamp(unix as i64, 0).unwrap_or_default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SessionStore for MemoryStore {
    async fn get_valid_token(&self) -> Result<Option<String>, StoreError> {
        self.check_available("get_valid_token")?;
        let now = self.clock.now_unix();
        let mut inner = self.inner.lock().await;

        match &inner.token {
            Some(stored) if now <= stored.expires_at => Ok(Some(stored.value.clone())),
            Some(_) => {
                inner.token = None;
                tracing::debug!("purged expired token on read");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn store_token(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available("store_token")?;
        let expires_at = self.clock.now_unix().saturating_add(ttl.as_secs());
        self.inner.lock().await.token = Some(StoredToken {
            value: token.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn remove_token(&self) -> Result<(), StoreError> {
        self.check_available("remove_token")?;
        self.inner.lock().await.token = None;
        Ok(())
    }

    async fn clear_expired_tokens(&self) -> Result<(), StoreError> {
        self.check_available("clear_expired_tokens")?;
        let now = self.clock.now_unix();
        let mut inner = self.inner.lock().await;
        if inner.token.as_ref().is_some_and(|t| now > t.expires_at) {
            inner.token = None;
        }
        Ok(())
    }

    async fn log_event(
        &self,
        kind: EventKind,
        actor: &str,
        metadata: Metadata,
    ) -> Result<(), StoreError> {
        self.check_available("log_event")?;
        let entry = EventLogEntry {
            kind,
            actor: actor.to_string(),
            metadata,
            timestamp: self.timestamp_at(self.clock.now_unix()),
        };
        self.inner.lock().await.events.push(entry);
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    async fn store_credential(
        &self,
        record: CredentialRecord,
        username: &str,
    ) -> Result<(), StoreError> {
        self.check_available("store_credential")?;
        let stored_at = self.timestamp_at(self.clock.now_unix());
        let mut inner = self.inner.lock().await;
        inner.credentials.retain(|c| c.record.id != record.id);
        inner.credentials.push(StoredCredential {
            username: username.to_string(),
            record,
            stored_at,
        });
        tracing::info!(%username, "passkey credential stored");
        Ok(())
    }

    async fn get_stored_credentials(&self) -> Result<Vec<StoredCredential>, StoreError> {
        self.check_available("get_stored_credentials")?;
        Ok(self.inner.lock().await.credentials.clone())
    }

    async fn credentials_for(&self, username: &str) -> Result<Vec<StoredCredential>, StoreError> {
        self.check_available("credentials_for")?;
        Ok(self
            .inner
            .lock()
            .await
            .credentials
            .iter()
            .filter(|c| c.username == username)
            .cloned()
            .collect())
    }
}
