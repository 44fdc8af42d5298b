//! Session tokens for Portal Seguro.
//!
//! This crate defines the credential that proves a session is valid:
//!
//! - **Claims** ([`TokenClaims`]): who the token belongs to and when it
//!   was issued.
//! - **Codec** ([`TokenCodec`] trait, [`HmacTokenCodec`]): how claims are
//!   turned into an opaque signed string and checked again later.
//! - **Clock** ([`Clock`] trait, [`SystemClock`], [`TokioClock`]): where
//!   "now" comes from when a token is issued or validated.
//! - **Errors** ([`TokenError`]): why a token was rejected.
//!
//! # Where it sits
//!
//! ```text
//! Session Manager (above)  ← issues on login, validates on restore and on every poll
//!     ↕
//! Token layer (this crate)  ← pure: no I/O, no side effects
//! ```
//!
//! Validation never panics and never returns an error to the caller of
//! [`TokenCodec::validate`]: a malformed, forged or expired token is
//! simply `false`.

mod claims;
mod clock;
mod codec;
mod error;

pub use claims::{ANONYMOUS_USER_ID, TokenClaims, excerpt};
pub use clock::{Clock, SystemClock, TokioClock};
pub use codec::{HmacTokenCodec, TokenCodec};
pub use error::TokenError;
