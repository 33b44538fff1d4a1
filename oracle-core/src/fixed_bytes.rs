//! Fixed-size byte arrays for circuit assignment.
//!
//! The circuit API wants compile-time-fixed array sizes (32, 16, 12, 8, ...).
//! [`FixedBytes`] zero-pads any input shorter than `N` and rejects input
//! longer than `N` — it never truncates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::OracleCoreError;

/// A byte array of exactly `N` bytes, built by zero-padding a shorter slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBytes<const N: usize>(pub [u8; N]);

impl<const N: usize> FixedBytes<N> {
  /// Zero-extends `src` to `N` bytes. Fails with
  /// [`OracleCoreError::SizeOverflow`] if `src` is longer than `N`.
  pub fn from_slice(src: &[u8]) -> Result<Self, OracleCoreError> {
    if src.len() > N {
      return Err(OracleCoreError::SizeOverflow { got: src.len(), max: N });
    }
    let mut out = [0u8; N];
    out[..src.len()].copy_from_slice(src);
    Ok(Self(out))
  }

  /// Decodes `hex` and zero-extends the result to `N` bytes.
  pub fn from_hex(hex: &str) -> Result<Self, OracleCoreError> {
    let bytes = hex::decode(hex)?;
    Self::from_slice(&bytes)
  }

  /// Returns the underlying bytes.
  pub fn as_bytes(&self) -> &[u8; N] { &self.0 }
}

impl<const N: usize> AsRef<[u8]> for FixedBytes<N> {
  fn as_ref(&self) -> &[u8] { &self.0 }
}

/// Serialized as lower-case hex, matching every other wire/artifact byte
/// field in this codebase (§6: "all hex-encoded byte strings").
impl<const N: usize> Serialize for FixedBytes<N> {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(&hex::encode(self.0)) }
}

impl<'de, const N: usize> Deserialize<'de> for FixedBytes<N> {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let s = String::deserialize(d)?;
    Self::from_hex(&s).map_err(serde::de::Error::custom)
  }
}
