//! Security event log entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form event details. JSON values so entries serialize as-is.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A session was started (login) or resumed from the store.
    SessionStart,
    /// An authenticated session ended.
    SessionEnd,
    /// A protected route was requested without a session.
    UnauthorizedAccess,
    /// A route was evaluated by the guard.
    RouteAccess,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStart => write!(f, "SESSION_START"),
            Self::SessionEnd => write!(f, "SESSION_END"),
            Self::UnauthorizedAccess => write!(f, "UNAUTHORIZED_ACCESS"),
            Self::RouteAccess => write!(f, "ROUTE_ACCESS"),
        }
    }
}

/// One append-only log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub kind: EventKind,
    /// Username, or `anonymous` when no session exists.
    pub actor: String,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}
