//! Error types for the token layer.

/// Why a token could not be issued or was rejected.
///
/// [`TokenCodec::validate`](crate::TokenCodec::validate) folds every
/// variant into `false`; [`TokenCodec::decode`](crate::TokenCodec::decode)
/// surfaces them for callers that want the reason (logging, renewal).
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not `payload.signature`, or either half is not valid
    /// base64url, or the payload is not a claims object.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the payload. Either the token was
    /// tampered with or it was signed with a different secret.
    #[error("token signature mismatch")]
    InvalidSignature,

    /// The token was genuine but its lifetime has elapsed.
    #[error("token expired at {expired_at}")]
    Expired { expired_at: u64 },

    /// The signing key was rejected by the MAC implementation.
    #[error("invalid signing key")]
    InvalidKey,

    /// Serializing the claims failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),
}
