//! Error type shared by the data-model layer.
//!
//! Variants are named after the error-kind taxonomy: each one covers a
//! specific failure that can occur while reading a captured session or
//! validating a policy, before any cryptography runs.

use thiserror::Error;

/// Errors produced by [`crate::session`], [`crate::policy`], and
/// [`crate::fixed_bytes`].
#[derive(Debug, Error)]
pub enum OracleCoreError {
  /// A file under the staging directory could not be read.
  #[error("io.read: {0}")]
  IoRead(#[from] std::io::Error),

  /// A staging artifact was not valid JSON.
  #[error("parse.json: {0}")]
  ParseJson(#[from] serde_json::Error),

  /// A hex-encoded field in the session file did not decode.
  #[error("parse.hex: {0}")]
  ParseHex(#[from] hex::FromHexError),

  /// The session file is missing a required secret, or a secret has the
  /// wrong size.
  #[error("kdc.invalid_session: {0}")]
  InvalidSession(String),

  /// A policy's fields violate the invariants in the data model (non-empty
  /// substring, positive value length, non-negative offset).
  #[error("policy.invalid: {0}")]
  InvalidPolicy(String),

  /// A byte slice did not fit the fixed-size array it was being copied into.
  #[error("witness.size_overflow: source is {got} bytes, array holds {max}")]
  SizeOverflow {
    /// Length of the source slice.
    got: usize,
    /// Capacity of the destination array.
    max: usize,
  },
}
