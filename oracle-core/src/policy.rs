//! The policy predicate a proof is generated against.
//!
//! A policy names a substring to find in a record's decrypted payload, the
//! location of a decimal value relative to that substring, and a threshold
//! the value must satisfy.

use serde::{Deserialize, Serialize};

use crate::error::OracleCoreError;

/// How the extracted value must relate to [`Policy::threshold_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueConstraint {
  /// The value must be strictly greater than the threshold.
  Gt,
  /// The value must be strictly less than the threshold.
  Lt,
  /// The value must equal the threshold.
  Eq,
}

impl ValueConstraint {
  /// Evaluates `self` for `value` against `threshold`, both parsed as
  /// unsigned decimal integers.
  pub fn evaluate(&self, value: u64, threshold: u64) -> bool {
    match self {
      ValueConstraint::Gt => value > threshold,
      ValueConstraint::Lt => value < threshold,
      ValueConstraint::Eq => value == threshold,
    }
  }
}

/// `{substring, value_start_idx_after_ss, value_length, threshold_value,
/// value_constraint}` as read from the policy file (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
  /// UTF-8 substring to locate in the record plaintext.
  pub substring: String,
  /// Byte offset of the value, counted from the end of the substring.
  pub value_start_idx_after_ss: usize,
  /// Length in bytes of the decimal value to extract.
  pub value_length: usize,
  /// Decimal threshold the extracted value is compared against.
  pub threshold_value: String,
  /// Which comparison to perform.
  pub value_constraint: ValueConstraint,
}

impl Policy {
  /// Checks the data-model invariants: `value_length > 0`,
  /// `len(substring) >= 1`, `value_start_idx_after_ss >= 0` (trivially true
  /// for an unsigned field, kept explicit for parity with the spec).
  pub fn validate(&self) -> Result<(), OracleCoreError> {
    if self.substring.is_empty() {
      return Err(OracleCoreError::InvalidPolicy("substring must not be empty".into()));
    }
    if self.value_length == 0 {
      return Err(OracleCoreError::InvalidPolicy("value_length must be > 0".into()));
    }
    self
      .threshold_value
      .parse::<u64>()
      .map_err(|e| OracleCoreError::InvalidPolicy(format!("threshold_value: {e}")))?;
    Ok(())
  }

  /// Parses [`Policy::threshold_value`] as an unsigned decimal integer.
  pub fn threshold(&self) -> Result<u64, OracleCoreError> {
    self
      .threshold_value
      .parse::<u64>()
      .map_err(|e| OracleCoreError::InvalidPolicy(format!("threshold_value: {e}")))
  }
}
