//! Codec trait and the HMAC-SHA256 implementation.
//!
//! The session layer doesn't care HOW a token is built, only that it can
//! issue one from claims and later tell whether it is still good. That is
//! the [`TokenCodec`] trait; [`HmacTokenCodec`] is the implementation the
//! portal ships with.
//!
//! ## Wire form
//!
//! ```text
//! base64url(json(claims)) "." base64url(hmac_sha256(secret, payload))
//! ```
//!
//! Both halves use the unpadded URL-safe alphabet so the token can sit in
//! a cookie, a URL or local storage without escaping.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::{Clock, TokenClaims, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated signing secret, in bytes.
const GENERATED_SECRET_LEN: usize = 32;

/// Issues and checks signed session tokens.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec is shared between the session actor and
///   anyone else that holds the portal.
/// - `'static` → it owns its secret and clock.
pub trait TokenCodec: Send + Sync + 'static {
    /// Encodes and signs the claims.
    ///
    /// # Errors
    /// Returns [`TokenError::Encode`] or [`TokenError::InvalidKey`] if the
    /// token cannot be produced. Valid claims never fail in practice.
    fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError>;

    /// Verifies the token and returns its claims.
    ///
    /// # Errors
    /// - [`TokenError::Malformed`]: not a token at all
    /// - [`TokenError::InvalidSignature`]: tampered or foreign token
    /// - [`TokenError::Expired`]: genuine but past `issued_at + ttl`
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError>;

    /// Current time on the clock the codec validates against.
    fn now_unix(&self) -> u64;

    /// `true` only for a well-formed, correctly signed, unexpired token.
    ///
    /// Never panics and never errors: every rejection is `false`.
    fn validate(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }
}

/// [`TokenCodec`] signing with HMAC-SHA256 over a shared secret.
pub struct HmacTokenCodec {
    secret: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl HmacTokenCodec {
    /// Creates a codec with a caller-supplied secret.
    pub fn new(secret: impl Into<Vec<u8>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
        }
    }

    /// Creates a codec with a fresh random secret.
    ///
    /// Tokens signed by one instance are rejected by every other instance,
    /// so this only suits processes that never need to read tokens written
    /// by a previous run.
    pub fn with_random_secret(clock: Arc<dyn Clock>) -> Self {
        let secret: [u8; GENERATED_SECRET_LEN] = rand::rng().random();
        Self::new(secret.to_vec(), clock)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)
    }
}

impl std::fmt::Debug for HmacTokenCodec {
    // The secret stays out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec for HmacTokenCodec {
    fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(TokenError::Encode)?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| TokenError::Malformed("missing signature".into()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("signature: {e}")))?;

        // Check the signature before parsing anything the client controls.
        // `verify_slice` compares in constant time.
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;
        let claims: TokenClaims = serde_json::from_slice(&json)
            .map_err(|e| TokenError::Malformed(format!("claims: {e}")))?;

        if claims.is_expired_at(self.clock.now_unix()) {
            return Err(TokenError::Expired {
                expired_at: claims.expires_at(),
            });
        }

        Ok(claims)
    }

    fn now_unix(&self) -> u64 {
        self.clock.now_unix()
    }
}
