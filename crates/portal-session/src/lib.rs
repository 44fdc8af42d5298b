//! Session lifecycle for Portal Seguro.
//!
//! This crate decides, at every moment, whether the current user is
//! signed in:
//!
//! 1. **Start / resume**: a fresh login issues and stores a token
//!    ([`SessionHandle::start_session`]); a reload resumes from the stored
//!    token ([`SessionHandle::init_session`]).
//! 2. **Keep alive**: user activity pushes back an inactivity deadline
//!    ([`ActivityMonitor`]), and a periodic validator re-checks the token.
//! 3. **Tear down**: logout, inactivity or an invalid token all end the
//!    session through one idempotent path ([`SessionHandle::end_session`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Route Guard (above)  ← asks "is anyone signed in?" before every navigation
//!     ↕
//! Session Layer (this crate)  ← owns the session, its timers and its token
//!     ↕
//! Token + Store (below)  ← signs tokens, persists them and the event log
//! ```

mod activity;
mod error;
mod manager;
mod session;

pub use activity::{ActivityHub, ActivityMonitor, ActivitySignal};
pub use error::SessionError;
pub use manager::{SessionHandle, spawn_session};
pub use session::{
    DEFAULT_TIMEOUT_SECS, EndReason, SessionConfig, SessionInfo, User,
    VALIDATION_INTERVAL, format_duration,
};

pub(crate) use session::Session;
