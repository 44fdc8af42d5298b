//! The payload carried inside a session token.

use serde::{Deserialize, Serialize};

/// User id recorded when the authenticating credential did not resolve
/// to a registered identity.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// How many leading characters of a token may appear in logs.
const EXCERPT_LEN: usize = 10;

/// Claims encoded in a session token.
///
/// The serialized field names are short and camel-cased because they end
/// up inside every token string; the Rust names stay descriptive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Registered user id, or [`ANONYMOUS_USER_ID`].
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Login name the session was started for.
    pub username: String,

    /// Id of the passkey credential used to authenticate.
    #[serde(rename = "credentialId")]
    pub credential_id: String,

    /// Unix seconds at issuance.
    #[serde(rename = "iat")]
    pub issued_at: u64,

    /// Lifetime in seconds, counted from `issued_at`.
    #[serde(rename = "ttl")]
    pub ttl_secs: u64,
}

impl TokenClaims {
    /// Builds claims for a fresh token.
    ///
    /// A missing `user_id` becomes [`ANONYMOUS_USER_ID`].
    pub fn new(
        user_id: Option<&str>,
        username: &str,
        credential_id: &str,
        issued_at: u64,
        ttl_secs: u64,
    ) -> Self {
        Self {
            user_id: user_id.unwrap_or(ANONYMOUS_USER_ID).to_string(),
            username: username.to_string(),
            credential_id: credential_id.to_string(),
            issued_at,
            ttl_secs,
        }
    }

    /// Last second (inclusive) at which the token is still valid.
    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.ttl_secs)
    }

    /// `true` once `now` is strictly past [`expires_at`](Self::expires_at).
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at()
    }

    /// Whether the claims were issued for an unregistered identity.
    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }
}

/// Returns a log-safe excerpt of a token: the first ten characters
/// followed by an ellipsis. Full tokens must never be logged.
pub fn excerpt(token: &str) -> String {
    let head: String = token.chars().take(EXCERPT_LEN).collect();
    format!("{head}...")
}
