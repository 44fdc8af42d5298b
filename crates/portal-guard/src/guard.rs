//! The route guard: decides whether a navigation may proceed.
//!
//! The navigation layer holds one [`RouteGuard`] and calls
//! [`before_navigation`](RouteGuard::before_navigation) for every target
//! before rendering anything. The call resolves only after the session
//! has been consulted (and, for protected routes, resumed from the store
//! when possible), so a protected view can never render ahead of its
//! check.

use portal_session::{SessionHandle, User};
use portal_store::{EventKind, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AccessClass, GuardError, Route, RoutePolicy};

/// Site name appended to every document title.
pub const SITE_NAME: &str = "Portal Seguro";

/// Guard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Reported in `UNAUTHORIZED_ACCESS` events.
    pub user_agent: String,

    /// Whether a session whose user has no registered id may visit
    /// protected routes.
    pub allow_anonymous: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("portal-seguro/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_anonymous: true,
        }
    }
}

/// Outcome of evaluating one navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
}

/// What the router hook hands back to the navigation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationOutcome {
    pub proceed: bool,
    #[serde(rename = "redirectTo", skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl From<Decision> for NavigationOutcome {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow => Self {
                proceed: true,
                redirect_to: None,
            },
            Decision::Redirect(route) => Self {
                proceed: false,
                redirect_to: Some(route.path().to_string()),
            },
        }
    }
}

/// Route guard bound to the process's session manager.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionHandle,
    policy: RoutePolicy,
    config: GuardConfig,
}

impl RouteGuard {
    pub fn new(session: SessionHandle, policy: RoutePolicy, config: GuardConfig) -> Self {
        Self {
            session,
            policy,
            config,
        }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Decides whether the session may visit `path`.
    ///
    /// Every call records a `ROUTE_ACCESS` event; a refused protected
    /// route also records `UNAUTHORIZED_ACCESS`. Both are best-effort.
    pub async fn evaluate(&self, path: &str) -> Decision {
        let class = self.policy.class_of(path);
        let mut user = self.current_user().await;

        let decision = match class {
            AccessClass::Protected => {
                if user.is_none() && self.session.init_session().await {
                    user = self.current_user().await;
                }
                match &user {
                    Some(u) if self.admits(u) => Decision::Allow,
                    Some(_) => {
                        tracing::info!(path, "anonymous session refused");
                        self.record_unauthorized(path).await;
                        Decision::Redirect(Route::Auth)
                    }
                    None => {
                        tracing::info!(path, "unauthenticated access refused");
                        self.record_unauthorized(path).await;
                        Decision::Redirect(Route::Auth)
                    }
                }
            }
            AccessClass::AuthOnly if user.as_ref().is_some_and(|u| self.admits(u)) => {
                Decision::Redirect(Route::Dashboard)
            }
            AccessClass::AuthOnly | AccessClass::Public => Decision::Allow,
        };

        let mut metadata = Metadata::new();
        metadata.insert("path".into(), json!(path));
        metadata.insert("authenticated".into(), json!(user.is_some()));
        self.session
            .record_event(EventKind::RouteAccess, metadata)
            .await;

        tracing::debug!(path, ?class, ?decision, "route evaluated");
        decision
    }

    /// Router hook run before a navigation.
    pub async fn before_navigation(&self, path: &str) -> NavigationOutcome {
        self.evaluate(path).await.into()
    }

    /// Router hook run after a navigation. Returns the document title.
    pub fn after_navigation(&self, path: &str) -> String {
        let title = match Route::from_path(path) {
            Some(route) => format!("{} - {SITE_NAME}", route.title()),
            None => SITE_NAME.to_string(),
        };
        tracing::trace!(path, %title, "navigation completed");
        title
    }

    /// Like [`evaluate`](Self::evaluate), but a refusal is an error.
    ///
    /// # Errors
    /// [`GuardError::AccessDenied`] when the navigation would be redirected.
    pub async fn protect(&self, path: &str) -> Result<(), GuardError> {
        match self.evaluate(path).await {
            Decision::Allow => Ok(()),
            Decision::Redirect(redirect_to) => Err(GuardError::AccessDenied {
                path: path.to_string(),
                redirect_to,
            }),
        }
    }

    fn admits(&self, user: &User) -> bool {
        self.config.allow_anonymous || !user.is_anonymous()
    }

    /// The signed-in user, if any. A stopped session manager counts as
    /// nobody signed in.
    async fn current_user(&self) -> Option<User> {
        self.session
            .session_info()
            .await
            .ok()
            .filter(|info| info.is_authenticated)
            .and_then(|info| info.user)
    }

    async fn record_unauthorized(&self, path: &str) {
        let mut metadata = Metadata::new();
        metadata.insert("path".into(), json!(path));
        metadata.insert("userAgent".into(), json!(self.config.user_agent));
        self.session
            .record_event(EventKind::UnauthorizedAccess, metadata)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_allow_proceeds() {
        let outcome = NavigationOutcome::from(Decision::Allow);
        assert!(outcome.proceed);
        assert_eq!(outcome.redirect_to, None);
    }

    #[test]
    fn test_outcome_from_redirect_carries_path() {
        let outcome = NavigationOutcome::from(Decision::Redirect(Route::Auth));
        assert!(!outcome.proceed);
        assert_eq!(outcome.redirect_to.as_deref(), Some("/auth"));
    }

    #[test]
    fn test_outcome_json_uses_redirect_to_key() {
        let json = serde_json::to_value(NavigationOutcome::from(Decision::Redirect(
            Route::Dashboard,
        )))
        .unwrap();
        assert_eq!(json, json!({ "proceed": false, "redirectTo": "/dashboard" }));

        let json = serde_json::to_value(NavigationOutcome::from(Decision::Allow)).unwrap();
        assert_eq!(json, json!({ "proceed": true }));
    }

    #[test]
    fn test_guard_config_default_allows_anonymous() {
        let config = GuardConfig::default();
        assert!(config.allow_anonymous);
        assert!(config.user_agent.starts_with("portal-seguro/"));
    }
}
