//! Navigation guard for Portal Seguro.
//!
//! Every route is classified by a [`RoutePolicy`] as public, protected or
//! auth-only. Before each navigation the [`RouteGuard`] checks the
//! classification against the session:
//!
//! | Class | Signed out | Signed in |
//! |-------|-----------|-----------|
//! | `Public` | allow | allow |
//! | `Protected` | try to resume, else redirect to `/auth` | allow |
//! | `AuthOnly` | allow | redirect to `/dashboard` |

mod error;
mod guard;
mod route;

pub use error::GuardError;
pub use guard::{Decision, GuardConfig, NavigationOutcome, RouteGuard, SITE_NAME};
pub use route::{AccessClass, Route, RoutePolicy};
