//! # Policy Locator (C4)
//!
//! Finds a [`Policy`]'s substring in a record's plaintext, computes the
//! 16-byte-block-aligned window (the "area of interest", AOI) covering the
//! substring and its associated value, and slices the matching plaintext
//! and ciphertext chunks for the witness assembler.
//!
//! `chunk_index` is published with a constant `+2` offset to account for
//! the two non-data records skipped at the record layer (the handshake
//! record and the Server Finished record, both counted against the record
//! sequence but never reaching this locator). Every *internal* slicing
//! offset — the chunk window itself, and the chunk-local substring/value
//! offsets — uses the un-shifted `chunk_index`; only the published field is
//! shifted.

use oracle_core::policy::Policy;
use serde::{Deserialize, Serialize};

use crate::errors::ProofError;

/// Number of non-data records (handshake, Server Finished) skipped at the
/// record layer but still counted against the sequence space, added to the
/// published `chunk_index` only (§4.3 step 8, §9).
pub const CHUNK_INDEX_RECORD_OFFSET: usize = 2;

const BLOCK_SIZE: usize = 16;

/// Everything [`locate`] publishes to `recorddata_public_input.json`,
/// plus the matching private plaintext chunks (§4.3 step 8, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatedRecordData {
  /// Block index of the area of interest, shifted by
  /// [`CHUNK_INDEX_RECORD_OFFSET`] for publication.
  pub chunk_index: usize,
  /// The policy's substring, verbatim.
  pub substring: String,
  /// Absolute byte offset of the substring's first byte in the full
  /// record plaintext.
  pub substring_start_idx: usize,
  /// Number of contiguous 16-byte chunks covering the area of interest.
  pub number_chunks: usize,
  /// `end_AOI - start_AOI`.
  pub size_area_of_interest: usize,
  /// `value_length`, copied from the policy for the circuit's convenience.
  pub size_value: usize,
  /// Ciphertext chunks, hex-encoded, `number_chunks * 16` bytes.
  pub cipher_chunks: String,
  /// Chunk-local byte offset where the substring begins.
  pub substring_start: usize,
  /// Chunk-local byte offset just past the substring.
  pub substring_end: usize,
  /// Chunk-local byte offset where the value begins.
  pub value_start: usize,
  /// Chunk-local byte offset just past the value.
  pub value_end: usize,
  /// Plaintext chunks, hex-encoded, `number_chunks * 16` bytes. Written to
  /// `recorddata_private_input.json` rather than the public artifact, kept
  /// alongside the public fields here for convenience before the witness
  /// assembler splits them apart.
  pub plain_chunks: String,
}

/// Runs the locator over one record's plaintext/ciphertext (§4.3).
pub fn locate(policy: &Policy, plaintext: &[u8], ciphertext: &[u8]) -> Result<LocatedRecordData, ProofError> {
  policy.validate().map_err(ProofError::Core)?;

  let substring = policy.substring.as_bytes();
  let start_idx = find_substring(plaintext, substring).ok_or_else(|| {
    tracing::debug!(substring = %policy.substring, "substring not found in this record");
    ProofError::SubstringNotFound(policy.substring.clone())
  })?;

  let start_aoi = start_idx;
  let end_aoi = start_idx + substring.len() + policy.value_start_idx_after_ss + policy.value_length;
  if end_aoi > plaintext.len() {
    return Err(ProofError::OutOfBounds(format!(
      "area of interest end {end_aoi} exceeds payload length {}",
      plaintext.len()
    )));
  }
  let size_aoi = end_aoi - start_aoi;

  let chunk_index = start_aoi / BLOCK_SIZE;
  let number_chunks = (start_aoi - chunk_index * BLOCK_SIZE + size_aoi) / BLOCK_SIZE + 1;

  let window_start = chunk_index * BLOCK_SIZE;
  let window_end = (chunk_index + number_chunks) * BLOCK_SIZE;
  if window_end > plaintext.len() || window_end > ciphertext.len() {
    return Err(ProofError::OutOfBounds(format!(
      "chunk window end {window_end} exceeds available plaintext/ciphertext"
    )));
  }
  let plain_chunks = &plaintext[window_start..window_end];
  let cipher_chunks = &ciphertext[window_start..window_end];

  let substring_start = start_aoi - window_start;
  let substring_end = substring_start + substring.len();
  let value_end = substring_start + size_aoi - 1;
  let value_start = value_end - policy.value_length;

  tracing::debug!(chunk_index, number_chunks, "located policy match");

  Ok(LocatedRecordData {
    chunk_index: chunk_index + CHUNK_INDEX_RECORD_OFFSET,
    substring: policy.substring.clone(),
    substring_start_idx: start_aoi,
    number_chunks,
    size_area_of_interest: size_aoi,
    size_value: policy.value_length,
    cipher_chunks: hex::encode(cipher_chunks),
    substring_start,
    substring_end,
    value_start,
    value_end,
    plain_chunks: hex::encode(plain_chunks),
  })
}

fn find_substring(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  if needle.is_empty() || needle.len() > haystack.len() {
    return None;
  }
  haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
  use oracle_core::policy::ValueConstraint;

  use super::*;

  fn policy(substring: &str, offset: usize, value_length: usize) -> Policy {
    Policy {
      substring: substring.into(),
      value_start_idx_after_ss: offset,
      value_length,
      threshold_value: "10000".into(),
      value_constraint: ValueConstraint::Gt,
    }
  }

  /// S1 — trivial local: substring starting at byte 100, value length 5.
  #[test]
  fn s1_trivial_local() {
    let mut payload = vec![b'x'; 100];
    payload.extend_from_slice(b"balance\":\"12345\"");
    payload.extend(std::iter::repeat(b'y').take(16));
    let cipher = vec![0u8; payload.len()];

    let p = policy("balance\":", 2, 5); // "12345" after the two quote/colon bytes
    let out = locate(&p, &payload, &cipher).unwrap();
    assert_eq!(out.chunk_index, 6 + 2);
    assert_eq!(out.substring_start, 4);
    assert_eq!(out.number_chunks, 2);
  }

  /// S2 — cross-block: substring starting at byte 14 of a 16-byte block.
  #[test]
  fn s2_cross_block() {
    let mut payload = vec![b'x'; 14];
    payload.extend_from_slice(b"balance\":\"99\"");
    payload.extend(std::iter::repeat(b'y').take(16));
    let cipher = vec![0u8; payload.len()];

    let p = policy("balance\":", 1, 2);
    let out = locate(&p, &payload, &cipher).unwrap();
    assert_eq!(out.chunk_index, 0 + 2);
    assert_eq!(out.number_chunks, 2);
    assert_eq!(out.substring_end, 23);
  }

  /// S3 — missing substring.
  #[test]
  fn s3_missing_substring() {
    let payload = b"no balance field here".to_vec();
    let cipher = vec![0u8; payload.len()];
    let p = policy("balance\":", 0, 5);
    let err = locate(&p, &payload, &cipher).unwrap_err();
    assert!(matches!(err, ProofError::SubstringNotFound(_)));
  }

  #[test]
  fn substring_at_position_zero() {
    let mut payload = b"balance\":\"12345\"".to_vec();
    payload.extend(std::iter::repeat(b'y').take(16));
    let cipher = vec![0u8; payload.len()];
    let p = policy("balance\":", 2, 5);
    let out = locate(&p, &payload, &cipher).unwrap();
    assert_eq!(out.chunk_index, 0 + 2);
    assert_eq!(out.substring_start, 0);
  }

  #[test]
  fn aoi_spanning_exactly_one_block() {
    // substring + offset + value_length == 15, entirely within one block
    // starting at a block boundary.
    let mut payload = b"0123456789012345".to_vec(); // 16 bytes
    payload.extend(std::iter::repeat(b'y').take(16));
    let cipher = vec![0u8; payload.len()];
    let p = policy("0123", 7, 4); // 4 + 7 + 4 = 15
    let out = locate(&p, &payload, &cipher).unwrap();
    assert_eq!(out.number_chunks, 1);
  }

  #[test]
  fn aoi_crossing_block_boundary_by_one_byte() {
    let mut payload = b"0123456789012345".to_vec(); // 16 bytes
    payload.extend(std::iter::repeat(b'y').take(16));
    let cipher = vec![0u8; payload.len()];
    let p = policy("0123", 7, 5); // size_AOI = 16, one byte past the prior case
    let out = locate(&p, &payload, &cipher).unwrap();
    assert_eq!(out.number_chunks, 2);
  }

  #[test]
  fn value_at_end_of_payload_minus_one_succeeds_at_end_fails() {
    // "balance\":\"12345\"" occupies a full 16-byte chunk; the area of
    // interest needs a second 16-byte chunk, so the payload must extend
    // to a full 32 bytes for the chunk window to fit.
    let core = b"balance\":\"12345\"".to_vec();
    let p = policy("balance\":", 2, 5);

    let mut enough_trailing = core.clone();
    enough_trailing.extend(std::iter::repeat(b'y').take(16)); // len == 32
    let cipher = vec![0u8; enough_trailing.len()];
    assert!(locate(&p, &enough_trailing, &cipher).is_ok());

    let mut one_byte_short = core;
    one_byte_short.extend(std::iter::repeat(b'y').take(15)); // len == 31
    let cipher = vec![0u8; one_byte_short.len()];
    let err = locate(&p, &one_byte_short, &cipher).unwrap_err();
    assert!(matches!(err, ProofError::OutOfBounds(_)));
  }
}
