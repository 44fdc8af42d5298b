//! Passkey credential records as handed over by the WebAuthn flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A public-key credential as returned by the platform authenticator.
///
/// The attestation (registration) or assertion (login) payload is kept
/// verbatim; this layer never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    #[serde(rename = "rawId")]
    pub raw_id: String,
    /// Always `public-key` for WebAuthn credentials.
    #[serde(rename = "type")]
    pub credential_type: String,
    pub response: serde_json::Value,
}

/// A [`CredentialRecord`] together with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub username: String,
    pub record: CredentialRecord,
    pub stored_at: DateTime<Utc>,
}
