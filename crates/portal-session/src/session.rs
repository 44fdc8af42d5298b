//! Session types: the data the session actor owns and the views it hands out.
//!
//! A "session" is the in-memory record of who is signed in on this page:
//! - WHO (`User`)
//! - WITH WHAT (the signed token)
//! - SINCE WHEN (`started_at`)
//! - FOR HOW LONG without activity (`timeout_secs`)

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use portal_token::TokenClaims;
use serde::{Deserialize, Serialize};

/// Default inactivity window: 15 minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 900;

/// How often the periodic validator re-checks the token.
///
/// Fixed; it does not follow `timeout_secs`.
pub const VALIDATION_INTERVAL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity window in seconds. Also the lifetime of issued tokens.
    pub timeout_secs: u64,

    /// Period of the token validator. Zero disables it.
    pub validation_interval: Duration,

    /// Re-issue the token on activity so it stays valid at least until the
    /// inactivity deadline; otherwise an active user would be logged out
    /// by the validator once the first token runs out.
    pub renew_on_activity: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            validation_interval: VALIDATION_INTERVAL,
            renew_on_activity: true,
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Registered user id. `None` when the credential did not resolve to a
    /// registered identity; tokens then carry `anonymous`.
    pub id: Option<String>,
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

impl User {
    /// A user known only by name.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            display_name: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// Rebuilds the user from a restored token.
    pub(crate) fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            id: (!claims.is_anonymous()).then(|| claims.user_id.clone()),
            username: claims.username.clone(),
            display_name: None,
        }
    }
}

// ---------------------------------------------------------------------------
// EndReason
// ---------------------------------------------------------------------------

/// Why a session ended. Recorded in the `SESSION_END` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    #[default]
    UserLogout,
    InactivityTimeout,
    TokenExpired,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserLogout => "user_logout",
            Self::InactivityTimeout => "inactivity_timeout",
            Self::TokenExpired => "token_expired",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The session record. Owned exclusively by the session actor.
///
/// Invariant: `authenticated` ⟺ `token.is_some()`, and `user` and
/// `started_at` are set exactly when `authenticated` is.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) authenticated: bool,
    pub(crate) user: Option<User>,
    pub(crate) token: Option<String>,
    /// Unix seconds.
    pub(crate) started_at: Option<u64>,
    pub(crate) timeout_secs: u64,
}

impl Session {
    pub(crate) fn empty(timeout_secs: u64) -> Self {
        Self {
            authenticated: false,
            user: None,
            token: None,
            started_at: None,
            timeout_secs,
        }
    }

    pub(crate) fn authenticated(
        user: User,
        token: String,
        started_at: u64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
            token: Some(token),
            started_at: Some(started_at),
            timeout_secs,
        }
    }

    /// Drops everything but the configured timeout.
    pub(crate) fn clear(&mut self) {
        *self = Self::empty(self.timeout_secs);
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn duration_at(&self, now: u64) -> u64 {
        self.started_at
            .map_or(0, |started| now.saturating_sub(started))
    }

    pub(crate) fn info(&self, now: u64) -> SessionInfo {
        let duration_secs = self.duration_at(now);
        SessionInfo {
            is_authenticated: self.authenticated,
            user: self.user.clone(),
            started_at: self
                .started_at
                .and_then(|s| DateTime::from_timestamp(s as i64, 0)),
            duration_secs,
            duration_formatted: format_duration(duration_secs),
            timeout_secs: self.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// Read-only view of the session, computed when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since `started_at`, 0 when signed out.
    pub duration_secs: u64,
    /// `duration_secs` as `1h 2m 3s`, leading zero units omitted.
    pub duration_formatted: String,
    pub timeout_secs: u64,
}

/// Formats seconds as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
