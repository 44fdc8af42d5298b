//! `Portal` builder and wiring.
//!
//! This is the entry point for embedding Portal Seguro. It ties the layers
//! together: clock → token codec → store → session manager → route guard,
//! plus the activity monitor that keeps the session alive.

use std::sync::Arc;

use portal_guard::{GuardConfig, NavigationOutcome, RouteGuard, RoutePolicy};
use portal_session::{
    ActivityHub, ActivityMonitor, EndReason, SessionConfig, SessionHandle, SessionInfo, User,
    spawn_session,
};
use portal_store::MemoryStore;
use portal_token::{Clock, HmacTokenCodec, SystemClock};
use serde::{Deserialize, Serialize};

use crate::PortalError;

/// Upper bound on redirects followed by [`Portal::navigate`].
const MAX_REDIRECTS: usize = 3;

/// Settings for every layer, loadable from JSON or any serde format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub session: SessionConfig,
    pub guard: GuardConfig,
}

/// Builder for a [`Portal`].
///
/// # Example
///
/// ```rust,ignore
/// use portal::prelude::*;
///
/// let portal = Portal::builder()
///     .timeout_secs(600)
///     .secret(b"load-me-from-the-environment".to_vec())
///     .build()?;
/// let outcome = portal.guard().before_navigation("/dashboard").await;
/// ```
pub struct PortalBuilder {
    config: PortalConfig,
    policy: RoutePolicy,
    secret: Option<Vec<u8>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PortalBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: PortalConfig::default(),
            policy: RoutePolicy::default(),
            secret: None,
            clock: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: PortalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.config.guard = config;
        self
    }

    /// Sets the inactivity window (and token lifetime).
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.session.timeout_secs = secs;
        self
    }

    /// Signing secret for session tokens. Without one, a random secret is
    /// generated and tokens do not survive a restart.
    pub fn secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Time source for tokens and the store. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wires every layer and starts the session manager.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`PortalError::Config`] for a zero timeout or an empty secret.
    pub fn build(self) -> Result<Portal, PortalError> {
        if self.config.session.timeout_secs == 0 {
            return Err(PortalError::Config("timeout_secs must be at least 1".into()));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let codec = match self.secret {
            Some(secret) if secret.is_empty() => {
                return Err(PortalError::Config("signing secret is empty".into()));
            }
            Some(secret) => HmacTokenCodec::new(secret, clock.clone()),
            None => {
                tracing::warn!("no signing secret configured, tokens will not survive a restart");
                HmacTokenCodec::with_random_secret(clock.clone())
            }
        };
        let codec = Arc::new(codec);
        let store = Arc::new(MemoryStore::new(clock));

        let session = spawn_session(self.config.session, codec.clone(), store.clone());
        let guard = RouteGuard::new(session.clone(), self.policy, self.config.guard);
        let activity = ActivityHub::new();
        let monitor = ActivityMonitor::mount(&activity, session.clone());

        tracing::info!("portal ready");
        Ok(Portal {
            session,
            guard,
            activity,
            monitor: Some(monitor),
            store,
            codec,
        })
    }
}

impl Default for PortalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a [`Portal::navigate`] call ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The path actually shown, after redirects.
    pub path: String,
    /// Document title for `path`.
    pub title: String,
    /// Whether the requested path was refused.
    pub redirected: bool,
}

/// A running portal: one session manager, its guard and activity monitor.
///
/// Dropping the portal (or calling [`teardown`](Self::teardown)) removes
/// the activity listeners and stops the session manager, timers included,
/// before returning.
pub struct Portal {
    session: SessionHandle,
    guard: RouteGuard,
    activity: ActivityHub,
    monitor: Option<ActivityMonitor>,
    store: Arc<MemoryStore>,
    codec: Arc<HmacTokenCodec>,
}

impl Portal {
    /// Creates a new builder.
    pub fn builder() -> PortalBuilder {
        PortalBuilder::new()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    /// The signal hub input sources emit activity into.
    pub fn activity(&self) -> &ActivityHub {
        &self.activity
    }

    /// Backing store: tokens, event log and passkey credentials.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn codec(&self) -> &Arc<HmacTokenCodec> {
        &self.codec
    }

    /// Starts a session after a successful passkey ceremony.
    ///
    /// # Errors
    /// See [`SessionHandle::start_session`].
    pub async fn login(
        &self,
        user: User,
        credential_id: impl Into<String>,
    ) -> Result<String, PortalError> {
        Ok(self.session.start_session(user, credential_id).await?)
    }

    pub async fn logout(&self) {
        self.session.end_session(EndReason::UserLogout).await;
    }

    /// # Errors
    /// [`PortalError::Session`] once the portal has been torn down.
    pub async fn session_info(&self) -> Result<SessionInfo, PortalError> {
        Ok(self.session.session_info().await?)
    }

    /// Navigates to `path`, following guard redirects. Gives up after a
    /// few hops so a misconfigured policy cannot loop forever.
    pub async fn navigate(&self, path: &str) -> Navigation {
        let mut current = path.to_string();
        let mut redirected = false;

        for _ in 0..=MAX_REDIRECTS {
            match self.guard.before_navigation(&current).await {
                NavigationOutcome {
                    proceed: false,
                    redirect_to: Some(target),
                } => {
                    redirected = true;
                    current = target;
                }
                _ => break,
            }
        }

        let title = self.guard.after_navigation(&current);
        Navigation {
            path: current,
            title,
            redirected,
        }
    }

    /// Unmounts the activity monitor and stops the session manager.
    pub fn teardown(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.unmount();
            self.session.shutdown();
            tracing::info!("portal torn down");
        }
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("session", &self.session)
            .field("mounted", &self.monitor.is_some())
            .finish_non_exhaustive()
    }
}
