//! Session manager: one actor task that owns the session.
//!
//! All session state lives inside [`SessionActor`], running in its own
//! Tokio task. The rest of the application talks to it through a
//! [`SessionHandle`], which just sends commands down an mpsc channel.
//!
//! # Ordering
//!
//! Three things can change the session: caller commands (login, logout,
//! restore), the inactivity deadline, and the periodic validator. All three
//! are branches of the same `tokio::select!` loop, and a branch runs to
//! completion, including its store awaits, before the loop polls again.
//! So a timer can never fire in the middle of a login that is waiting on
//! the store: every mutation is serialized.
//!
//! ```text
//!   SessionHandle ──cmd──→ ┌──────────── select! ────────────┐
//!   SessionHandle ──cmd──→ │ commands │ inactivity │ validator │
//!   ActivityMonitor ─reset→└──────────────────────────────────┘
//!                                   │
//!                        TokenCodec + SessionStore
//! ```
//!
//! # Lifecycle
//!
//! Exactly one manager per process: spawn it once at startup with
//! [`spawn_session`] and pass clones of the handle to whoever needs them.
//! [`SessionHandle::shutdown`] stops it (timers included) synchronously;
//! dropping every handle stops it too.

use std::sync::Arc;

use portal_store::{EventKind, Metadata, SessionStore};
use portal_timer::{Deadline, Ticker};
use portal_token::{TokenClaims, TokenCodec, excerpt};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use crate::{EndReason, Session, SessionConfig, SessionError, SessionInfo, User};

/// Command channel size. Activity resets beyond this are dropped; one
/// queued reset is as good as many.
const CHANNEL_SIZE: usize = 64;

/// Actor name logged when no session exists.
const ANONYMOUS_ACTOR: &str = "anonymous";

/// Commands sent to the session actor.
///
/// Variants with a `reply` are request/response; the rest are
/// fire-and-forget.
pub(crate) enum SessionCommand {
    Init {
        reply: oneshot::Sender<bool>,
    },
    Start {
        user: User,
        credential_id: String,
        reply: oneshot::Sender<Result<String, SessionError>>,
    },
    End {
        reason: EndReason,
        reply: oneshot::Sender<()>,
    },
    UpdateTimeout {
        secs: u64,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ResetInactivity,
    Info {
        reply: oneshot::Sender<SessionInfo>,
    },
    RecordEvent {
        kind: EventKind,
        metadata: Metadata,
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to the running session actor.
///
/// Cheap to clone: an `mpsc::Sender` and an abort handle.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    task: AbortHandle,
}

impl SessionHandle {
    /// Tries to resume a session from the stored token.
    ///
    /// Returns `true` if a session is active afterwards. Already being
    /// authenticated counts as success and changes nothing. A missing,
    /// invalid or unreadable token is `false`, never an error, and so is
    /// the token of a session that was ended in this process.
    pub async fn init_session(&self) -> bool {
        self.request(|reply| SessionCommand::Init { reply })
            .await
            .unwrap_or(false)
    }

    /// Starts a session after a successful passkey authentication and
    /// returns the issued token.
    ///
    /// # Errors
    /// [`SessionError::Token`] or [`SessionError::StoreUnavailable`] if the
    /// token could not be issued or persisted; the previous session state
    /// is then untouched.
    pub async fn start_session(
        &self,
        user: User,
        credential_id: impl Into<String>,
    ) -> Result<String, SessionError> {
        let credential_id = credential_id.into();
        self.request(|reply| SessionCommand::Start {
            user,
            credential_id,
            reply,
        })
        .await?
    }

    /// Ends the session. Safe to call any number of times, authenticated
    /// or not.
    pub async fn end_session(&self, reason: EndReason) {
        let _ = self
            .request(|reply| SessionCommand::End { reason, reply })
            .await;
    }

    /// Changes the inactivity window. An active session restarts its
    /// deadline under the new window immediately.
    ///
    /// # Errors
    /// [`SessionError::InvalidTimeout`] for zero seconds.
    pub async fn update_session_timeout(&self, secs: u64) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::UpdateTimeout { secs, reply })
            .await?
    }

    /// Pushes the inactivity deadline back to a full window from now.
    ///
    /// Never blocks: this is called from input handlers. No-op while
    /// signed out.
    pub fn reset_inactivity_timer(&self) {
        if let Err(e) = self.sender.try_send(SessionCommand::ResetInactivity) {
            tracing::trace!(error = %e, "activity reset dropped");
        }
    }

    /// Current session view, computed now.
    ///
    /// The token is checked first: a session whose token no longer
    /// validates is ended with [`EndReason::TokenExpired`] and reported
    /// signed out.
    ///
    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub async fn session_info(&self) -> Result<SessionInfo, SessionError> {
        self.request(|reply| SessionCommand::Info { reply }).await
    }

    /// Whether a session is active. `false` after shutdown.
    pub async fn is_authenticated(&self) -> bool {
        self.session_info()
            .await
            .is_ok_and(|info| info.is_authenticated)
    }

    /// Appends an event to the log on behalf of the current actor.
    /// Best-effort: failures are logged locally and dropped.
    pub async fn record_event(&self, kind: EventKind, metadata: Metadata) {
        let _ = self
            .request(|reply| SessionCommand::RecordEvent {
                kind,
                metadata,
                reply,
            })
            .await;
    }

    /// Stops the actor immediately, cancelling the inactivity deadline
    /// and the validator. The in-memory session is discarded; the stored
    /// token is kept so the next process can resume it.
    pub fn shutdown(&self) {
        if !self.task.is_finished() {
            tracing::info!("session manager shutting down");
        }
        self.task.abort();
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.task.is_finished()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SessionActor
// ---------------------------------------------------------------------------

/// The actor state. Runs inside a Tokio task.
struct SessionActor<C: TokenCodec, S: SessionStore> {
    session: Session,
    /// Token of the last ended session. Never restored, even if the store
    /// failed to delete it.
    ended_token: Option<String>,
    config: SessionConfig,
    codec: Arc<C>,
    store: Arc<S>,
    inactivity: Deadline,
    validator: Ticker,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl<C: TokenCodec, S: SessionStore> SessionActor<C, S> {
    /// Runs the actor loop until every handle is dropped or the task is
    /// aborted.
    async fn run(mut self) {
        tracing::info!(
            timeout_secs = self.session.timeout_secs,
            "session manager started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                () = self.inactivity.wait() => {
                    tracing::info!("inactivity timeout reached");
                    self.end_session(EndReason::InactivityTimeout).await;
                }
                _ = self.validator.tick() => self.revalidate().await,
            }
        }

        self.inactivity.disarm();
        tracing::info!("session manager stopped");
    }

    async fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Init { reply } => {
                let result = self.init_session().await;
                let _ = reply.send(result);
            }
            SessionCommand::Start {
                user,
                credential_id,
                reply,
            } => {
                let result = self.start_session(user, credential_id).await;
                let _ = reply.send(result);
            }
            SessionCommand::End { reason, reply } => {
                self.end_session(reason).await;
                let _ = reply.send(());
            }
            SessionCommand::UpdateTimeout { secs, reply } => {
                let _ = reply.send(self.update_timeout(secs));
            }
            SessionCommand::ResetInactivity => self.reset_inactivity().await,
            SessionCommand::Info { reply } => {
                self.revalidate().await;
                let _ = reply.send(self.session.info(self.codec.now_unix()));
            }
            SessionCommand::RecordEvent {
                kind,
                metadata,
                reply,
            } => {
                self.record(kind, metadata).await;
                let _ = reply.send(());
            }
        }
    }

    async fn init_session(&mut self) -> bool {
        self.revalidate().await;
        if self.session.authenticated {
            return true;
        }

        let token = match self.store.get_valid_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored token");
                return false;
            }
        };

        if self.ended_token.as_deref() == Some(token.as_str()) {
            tracing::debug!("stored token belongs to an ended session");
            if let Err(e) = self.store.remove_token().await {
                tracing::warn!(error = %e, "could not remove stored token");
            }
            return false;
        }

        let claims = match self.codec.decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "stored token rejected");
                return false;
            }
        };

        let now = self.codec.now_unix();
        let user = User::from_claims(&claims);
        let username = user.username.clone();
        self.session = Session::authenticated(user, token, now, self.session.timeout_secs);

        let mut metadata = Metadata::new();
        metadata.insert("restored".into(), json!(true));
        metadata.insert("token".into(), json!(excerpt(self.current_token())));
        self.record(EventKind::SessionStart, metadata).await;

        self.inactivity.arm(self.session.timeout());
        tracing::info!(%username, "session restored from store");
        true
    }

    async fn start_session(
        &mut self,
        user: User,
        credential_id: String,
    ) -> Result<String, SessionError> {
        let now = self.codec.now_unix();
        let timeout_secs = self.session.timeout_secs;
        let claims = TokenClaims::new(
            user.id.as_deref(),
            &user.username,
            &credential_id,
            now,
            timeout_secs,
        );

        // Nothing is committed until both the token and its storage succeed.
        let token = self.codec.issue(&claims)?;
        self.store
            .store_token(&token, self.session.timeout())
            .await?;

        if self.session.authenticated {
            tracing::debug!("replacing the active session");
        }
        let username = user.username.clone();
        self.session = Session::authenticated(user, token.clone(), now, timeout_secs);
        self.ended_token = None;

        let mut metadata = Metadata::new();
        metadata.insert("username".into(), json!(username));
        metadata.insert("credentialId".into(), json!(credential_id));
        self.record(EventKind::SessionStart, metadata).await;

        self.inactivity.arm(self.session.timeout());
        tracing::info!(%username, %credential_id, "session started");
        Ok(token)
    }

    async fn end_session(&mut self, reason: EndReason) {
        if self.session.authenticated {
            let duration = self.session.duration_at(self.codec.now_unix());

            let mut metadata = Metadata::new();
            metadata.insert("reason".into(), json!(reason.as_str()));
            metadata.insert("duration".into(), json!(duration));
            self.record(EventKind::SessionEnd, metadata).await;

            if let Err(e) = self.store.remove_token().await {
                tracing::warn!(error = %e, "could not remove stored token");
            }
            self.ended_token = self.session.token.take();
            tracing::info!(%reason, duration_secs = duration, "session ended");
        }

        self.inactivity.disarm();
        self.session.clear();

        if let Err(e) = self.store.clear_expired_tokens().await {
            tracing::warn!(error = %e, "could not purge expired tokens");
        }
    }

    fn update_timeout(&mut self, secs: u64) -> Result<(), SessionError> {
        if secs == 0 {
            return Err(SessionError::InvalidTimeout(secs));
        }
        self.session.timeout_secs = secs;
        if self.session.authenticated {
            self.inactivity.arm(self.session.timeout());
        }
        tracing::info!(timeout_secs = secs, "session timeout updated");
        Ok(())
    }

    async fn reset_inactivity(&mut self) {
        if !self.session.authenticated {
            return;
        }
        self.inactivity.arm(self.session.timeout());
        tracing::trace!("inactivity timer reset");

        if self.config.renew_on_activity {
            self.renew_if_aging().await;
        }
    }

    /// Re-issues the token when it would run out before the inactivity
    /// deadline that was just armed. Token times are whole seconds, so
    /// this happens at most once per second of activity.
    async fn renew_if_aging(&mut self) {
        let Some(token) = &self.session.token else {
            return;
        };
        // An already-invalid token is left for the validator to end.
        let Ok(claims) = self.codec.decode(token) else {
            return;
        };

        let now = self.codec.now_unix();
        if claims.expires_at() >= now.saturating_add(self.session.timeout_secs) {
            return;
        }

        let fresh = TokenClaims {
            issued_at: now,
            ttl_secs: self.session.timeout_secs,
            ..claims
        };
        let renewed = match self.codec.issue(&fresh) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "token renewal failed");
                return;
            }
        };
        match self.store.store_token(&renewed, self.session.timeout()).await {
            Ok(()) => {
                self.session.token = Some(renewed);
                tracing::debug!("session token renewed");
            }
            Err(e) => tracing::warn!(error = %e, "token renewal not persisted"),
        }
    }

    async fn revalidate(&mut self) {
        if !self.session.authenticated {
            return;
        }
        let valid = self
            .session
            .token
            .as_deref()
            .is_some_and(|t| self.codec.validate(t));
        if !valid {
            tracing::warn!("session token no longer valid");
            self.end_session(EndReason::TokenExpired).await;
        }
    }

    /// Best-effort event log write.
    async fn record(&self, kind: EventKind, metadata: Metadata) {
        let actor = self
            .session
            .user
            .as_ref()
            .map_or(ANONYMOUS_ACTOR, |u| u.username.as_str());
        if let Err(e) = self.store.log_event(kind, actor, metadata).await {
            tracing::warn!(%kind, error = %e, "event log write dropped");
        }
    }

    fn current_token(&self) -> &str {
        self.session.token.as_deref().unwrap_or_default()
    }
}

/// Spawns the session actor and returns its handle.
///
/// Call once per process.
pub fn spawn_session<C, S>(config: SessionConfig, codec: Arc<C>, store: Arc<S>) -> SessionHandle
where
    C: TokenCodec,
    S: SessionStore,
{
    let (tx, rx) = mpsc::channel(CHANNEL_SIZE);

    if config.timeout_secs == 0 {
        tracing::warn!("session timeout of 0s would end every session at once, using 1s");
    }

    let actor = SessionActor {
        session: Session::empty(config.timeout_secs.max(1)),
        ended_token: None,
        validator: Ticker::new(config.validation_interval),
        inactivity: Deadline::new(),
        config,
        codec,
        store,
        receiver: rx,
    };

    let task = tokio::spawn(actor.run()).abort_handle();

    SessionHandle { sender: tx, task }
}
