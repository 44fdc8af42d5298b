//! Known routes and the policy table that classifies them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every route the portal knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Home,
    Auth,
    Dashboard,
    Security,
    Profile,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Self::Home,
        Self::Auth,
        Self::Dashboard,
        Self::Security,
        Self::Profile,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Auth => "/auth",
            Self::Dashboard => "/dashboard",
            Self::Security => "/security",
            Self::Profile => "/profile",
        }
    }

    /// Page name shown in the document title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Home => "Inicio",
            Self::Auth => "Autenticación",
            Self::Dashboard => "Panel",
            Self::Security => "Seguridad",
            Self::Profile => "Perfil",
        }
    }

    /// Resolves a navigation target to a known route.
    ///
    /// Query string, fragment and a trailing slash are ignored, so
    /// `/dashboard/?tab=1` is [`Route::Dashboard`]. Anything else is `None`.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = normalize(path);
        Self::ALL.into_iter().find(|r| r.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// Who may visit a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessClass {
    /// Anyone.
    Public,
    /// Signed-in users only; others go to the login page.
    Protected,
    /// Signed-out users only; signed-in users go to the dashboard.
    AuthOnly,
}

/// Maps routes to access classes.
///
/// Paths that are not a known [`Route`], and routes without an entry,
/// get the table's default class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    classes: HashMap<Route, AccessClass>,
    default: AccessClass,
}

impl RoutePolicy {
    /// An empty table: every path gets `default`.
    pub fn new(default: AccessClass) -> Self {
        Self {
            classes: HashMap::new(),
            default,
        }
    }

    /// Sets the class for one route.
    pub fn with(mut self, route: Route, class: AccessClass) -> Self {
        self.classes.insert(route, class);
        self
    }

    pub fn class_of_route(&self, route: Route) -> AccessClass {
        self.classes.get(&route).copied().unwrap_or(self.default)
    }

    /// Classifies a navigation target.
    pub fn class_of(&self, path: &str) -> AccessClass {
        Route::from_path(path).map_or(self.default, |r| self.class_of_route(r))
    }
}

impl Default for RoutePolicy {
    /// The portal's table: `/` public, `/auth` for signed-out users,
    /// everything under the account protected, unknown paths public.
    fn default() -> Self {
        Self::new(AccessClass::Public)
            .with(Route::Home, AccessClass::Public)
            .with(Route::Auth, AccessClass::AuthOnly)
            .with(Route::Dashboard, AccessClass::Protected)
            .with(Route::Security, AccessClass::Protected)
            .with(Route::Profile, AccessClass::Protected)
    }
}
