//! # Portal Seguro
//!
//! Session core for passkey-protected web portals.
//!
//! After the passkey ceremony succeeds, Portal Seguro issues a signed,
//! time-bound session token, persists it, ends the session after a period
//! of inactivity and gates every navigation on the session state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portal::prelude::*;
//!
//! # async fn run() -> Result<(), PortalError> {
//! let portal = Portal::builder()
//!     .timeout_secs(900)
//!     .secret(b"a-long-random-secret".to_vec())
//!     .build()?;
//!
//! portal.login(User::named("alice"), "credential-id").await?;
//! let page = portal.navigate("/dashboard").await;
//! assert_eq!(page.path, "/dashboard");
//! # Ok(())
//! # }
//! ```

mod error;
mod portal;

pub use error::PortalError;
pub use portal::{Navigation, Portal, PortalBuilder, PortalConfig};

pub use portal_guard as guard;
pub use portal_session as session;
pub use portal_store as store;
pub use portal_timer as timer;
pub use portal_token as token;

pub mod prelude {
    pub use crate::{Navigation, Portal, PortalBuilder, PortalConfig, PortalError};
    pub use portal_guard::{
        AccessClass, Decision, GuardConfig, GuardError, NavigationOutcome, Route, RouteGuard,
        RoutePolicy,
    };
    pub use portal_session::{
        ActivityHub, ActivityMonitor, ActivitySignal, EndReason, SessionConfig, SessionError,
        SessionHandle, SessionInfo, User,
    };
    pub use portal_store::{
        CredentialRecord, CredentialStore, EventKind, EventLogEntry, MemoryStore, SessionStore,
        StoreError, StoredCredential,
    };
    pub use portal_token::{
        Clock, HmacTokenCodec, SystemClock, TokenClaims, TokenCodec, TokenError, TokioClock,
    };
}
