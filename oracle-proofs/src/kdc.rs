//! # KDC Deriver (C2)
//!
//! Re-implements the TLS 1.3 key schedule for `TLS_AES_128_GCM_SHA256`,
//! splitting every HMAC-SHA256 inside the HKDF ladder into a prover-side
//! "intermediate hash state" (the SHA-256 midstate after compressing the
//! ipad/opad-keyed block, via [`sha2::compress256`] — no finalization) and a
//! single one-block final message that is the only hash the circuit itself
//! must verify.
//!
//! ## Ladder
//!
//! ```text
//! dHS  = HKDF-Expand-Label(HS, "derived", SHA256(""), 32)
//! MS   = HKDF-Extract(dHS, 0^32)                         (= HMAC(dHS, 0^32))
//! SATS = HKDF-Expand-Label(MS, "s ap traffic", H3, 32)
//! CATS = HKDF-Expand-Label(MS, "c ap traffic", H3, 32)
//! key  = HKDF-Expand-Label(XATS, "key", "", 16)
//! iv   = HKDF-Expand-Label(XATS, "iv",  "", 12)
//! ```
//!
//! Every `*_in` value below is the 32-byte inner digest produced by
//! finishing the ipad-keyed compression with a given message — i.e. exactly
//! the `SHA256_from_state(H_ipad(K), msg)` half of
//! `HMAC(K, msg) = SHA256_from_state(H_opad(K), SHA256_from_state(H_ipad(K), msg) ‖ mdpad)`.
//! `dHS_in` is the only one of these the witness assembler (C5) pads out to
//! a full 64-byte block, because it is the only private one (§4.4).

use generic_array::{typenum::U64, GenericArray};
use oracle_core::session::SessionSecrets;
use serde::{Deserialize, Serialize};
use sha2::{compress256, Digest, Sha256};

use crate::errors::ProofError;

const SHA256_IV: [u32; 8] =
  [0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19];

/// `SHA256(b"")`, used as the transcript-hash context for deriving `dHS`.
fn empty_transcript_hash() -> [u8; 32] { Sha256::digest(b"").into() }

fn state_to_bytes(state: [u32; 8]) -> [u8; 32] {
  let mut out = [0u8; 32];
  for (i, word) in state.iter().enumerate() {
    out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
  }
  out
}

/// Builds the 64-byte ipad- or opad-keyed block: `K` zero-extended to 64
/// bytes, XORed with the padding constant repeated across the block.
fn keyed_block(key: &[u8], pad_byte: u8) -> GenericArray<u8, U64> {
  let mut block = [pad_byte; 64];
  for (b, k) in block.iter_mut().zip(key.iter()) {
    *b ^= *k;
  }
  GenericArray::clone_from_slice(&block)
}

/// `H_ipad(K)` — compress the ipad-keyed block into the SHA-256 initial
/// state, without finalizing.
fn ipad_state(key: &[u8]) -> [u32; 8] {
  let mut state = SHA256_IV;
  compress256(&mut state, &[keyed_block(key, 0x36)]);
  state
}

/// `H_opad(K)` — compress the opad-keyed block into the SHA-256 initial
/// state, without finalizing.
fn opad_state(key: &[u8]) -> [u32; 8] {
  let mut state = SHA256_IV;
  compress256(&mut state, &[keyed_block(key, 0x5c)]);
  state
}

/// Finishes a Merkle-Damgard hash from an already-absorbed `state`, given
/// how many bytes (`absorbed_before`) were already compressed into it and
/// the remaining `msg`. Applies standard SHA-256 md-padding and compresses
/// every resulting block. For every message used in this ladder the padded
/// remainder fits in exactly one additional 64-byte block, which is the
/// "one compression per HKDF step" property the KDC split is built for.
fn finalize_from_state(state: [u32; 8], absorbed_before: u64, msg: &[u8]) -> [u8; 32] {
  let mut state = state;
  let total_bits = (absorbed_before + msg.len() as u64) * 8;
  let mut padded = msg.to_vec();
  padded.push(0x80);
  while (padded.len() + 8) % 64 != 0 {
    padded.push(0);
  }
  padded.extend_from_slice(&total_bits.to_be_bytes());
  for block in padded.chunks(64) {
    compress256(&mut state, &[GenericArray::clone_from_slice(block)]);
  }
  state_to_bytes(state)
}

/// `SHA256_from_state(H_ipad(K), msg)` — the 32-byte inner digest that is
/// published as a `*_in` field.
fn inner_digest(key: &[u8], msg: &[u8]) -> [u8; 32] { finalize_from_state(ipad_state(key), 64, msg) }

/// `HMAC(K, msg)`, built from the two halves above. Used where the full
/// HMAC output (not just the inner digest) is needed to continue the
/// ladder.
fn hmac(key: &[u8], msg: &[u8]) -> [u8; 32] {
  let inner = inner_digest(key, msg);
  finalize_from_state(opad_state(key), 64, &inner)
}

/// RFC 8446 §7.1 `HkdfLabel` struct, serialized, with the single counter
/// byte HKDF-Expand appends for the first (and, for our ≤32-byte outputs,
/// only) output block.
fn expand_label_message(label: &str, context: &[u8], length: u16) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&length.to_be_bytes());
  let full_label = format!("tls13 {label}");
  out.push(full_label.len() as u8);
  out.extend_from_slice(full_label.as_bytes());
  out.push(context.len() as u8);
  out.extend_from_slice(context);
  out.push(0x01); // HKDF-Expand counter, first block
  out
}

/// `HKDF-Expand-Label(secret, label, context, length)`, returning the
/// `*_in` inner digest and the finished (and length-truncated) output.
fn expand_label(secret: &[u8], label: &str, context: &[u8], length: u16) -> ([u8; 32], Vec<u8>) {
  let msg = expand_label_message(label, context, length);
  let msg_in = inner_digest(secret, &msg);
  let full = finalize_from_state(opad_state(secret), 64, &msg_in);
  (msg_in, full[..length as usize].to_vec())
}

fn to_hex(bytes: &[u8]) -> String { hex::encode(bytes) }

/// Every KDC quantity for one traffic direction (server or client
/// application traffic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionKdc {
  /// `XATSin` — inner digest produced while deriving this direction's
  /// application traffic secret from `MS`.
  pub xats_in: String,
  /// This direction's application traffic secret (`SATS` or `CATS`).
  pub xats: String,
  /// Ipad state keyed by `XATS`, shared by the `key` and `iv` expansions.
  pub intermediate_hash_xats_ipad: String,
  /// Opad state keyed by `XATS`.
  pub intermediate_hash_xats_opad: String,
  /// `tkXAPPin` — inner digest for the `"key"` expansion.
  pub tk_xapp_in: String,
  /// `IVin` — inner digest for the `"iv"` expansion.
  pub iv_in: String,
  /// Derived AEAD key, 16 bytes.
  pub key: String,
  /// Derived AEAD IV, 12 bytes.
  pub iv: String,
  /// `SHA256(key)`.
  pub hash_key: String,
  /// `SHA256(iv)`.
  pub hash_iv: String,
}

/// Every quantity the KDC deriver produces, before it is split into the
/// shared / public / private artifact categories (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdcOutput {
  /// `intermediateHashHSipad`.
  pub intermediate_hash_hs_ipad: String,
  /// `intermediateHashHSopad`.
  pub intermediate_hash_hs_opad: String,
  /// `dHSin` — the only private input; the 32-byte inner digest the witness
  /// assembler pads to a full block (§4.4).
  pub dhs_in: String,
  /// `dHS`, used only internally to continue the ladder (never published).
  #[serde(skip)]
  pub dhs: [u8; 32],
  /// `intermediateHashdHSipad`, the ipad state keyed by `dHS`.
  pub intermediate_hash_dhs_ipad: String,
  /// `SHTSin`, used only for the cross-check in [`KdcOutput::verify_shts`].
  pub shts_in: String,
  /// `MSin`.
  pub ms_in: String,
  /// `MS`, used only internally.
  #[serde(skip)]
  pub ms: [u8; 32],
  /// `intermediateHashMSipad`.
  pub intermediate_hash_ms_ipad: String,
  /// Server application traffic material.
  pub server: DirectionKdc,
  /// Client application traffic material.
  pub client: DirectionKdc,
}

fn derive_direction(ms: &[u8; 32], label: &str, h3: &[u8]) -> DirectionKdc {
  let (xats_in, xats) = expand_label(ms, label, h3, 32);
  let (tk_xapp_in, key) = expand_label(&xats, "key", b"", 16);
  let (iv_in, iv) = expand_label(&xats, "iv", b"", 12);
  DirectionKdc {
    xats_in: to_hex(&xats_in),
    xats: to_hex(&xats),
    intermediate_hash_xats_ipad: to_hex(&state_to_bytes(ipad_state(&xats))),
    intermediate_hash_xats_opad: to_hex(&state_to_bytes(opad_state(&xats))),
    tk_xapp_in: to_hex(&tk_xapp_in),
    iv_in: to_hex(&iv_in),
    hash_key: to_hex(&Sha256::digest(&key)),
    hash_iv: to_hex(&Sha256::digest(&iv)),
    key: to_hex(&key),
    iv: to_hex(&iv),
  }
}

impl KdcOutput {
  /// Runs the full ladder (§4.1) over a loaded session's secrets.
  pub fn derive(secrets: &SessionSecrets) -> Result<Self, ProofError> {
    secrets.validate().map_err(|e| ProofError::InvalidSession(e.to_string()))?;
    let hs = secrets.hs.as_slice();

    let (dhs_in, dhs_vec) = expand_label(hs, "derived", &empty_transcript_hash(), 32);
    let dhs: [u8; 32] = dhs_vec.try_into().expect("expand_label(len=32) returns 32 bytes");

    let (shts_in, _shts) = expand_label(hs, "s hs traffic", &secrets.h2, 32);

    let ms_in = inner_digest(&dhs, &[0u8; 32]);
    let ms = hmac(&dhs, &[0u8; 32]);

    let server = derive_direction(&ms, "s ap traffic", &secrets.h3);
    let client = derive_direction(&ms, "c ap traffic", &secrets.h3);
    tracing::debug!("derived server and client application traffic keys");

    Ok(Self {
      intermediate_hash_hs_ipad: to_hex(&state_to_bytes(ipad_state(hs))),
      intermediate_hash_hs_opad: to_hex(&state_to_bytes(opad_state(hs))),
      dhs_in: to_hex(&dhs_in),
      dhs,
      intermediate_hash_dhs_ipad: to_hex(&state_to_bytes(ipad_state(&dhs))),
      shts_in: to_hex(&shts_in),
      ms_in: to_hex(&ms_in),
      ms,
      intermediate_hash_ms_ipad: to_hex(&state_to_bytes(ipad_state(&ms))),
      server,
      client,
    })
  }

  /// Cross-checks the derived ladder against the session's recorded `SHTS`
  /// (`SPEC_FULL.md` §12, recovered from `ProcessSF` in the original
  /// source). Called by the pipeline immediately after derivation, before
  /// any artifact is persisted.
  pub fn verify_shts(&self, secrets: &SessionSecrets) -> Result<(), ProofError> {
    let hs = secrets.hs.as_slice();
    let msg_in = hex::decode(&self.shts_in).map_err(|e| ProofError::InvalidSession(e.to_string()))?;
    let shts = finalize_from_state(opad_state(hs), 64, &msg_in);
    if shts.as_slice() == secrets.shts.as_slice() {
      tracing::debug!("SHTS cross-check passed");
      Ok(())
    } else {
      tracing::error!("SHTS cross-check failed: derived ladder disagrees with session");
      Err(ProofError::ShtsMismatch)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn secrets() -> SessionSecrets {
    SessionSecrets {
      hs:   vec![0x11; 32],
      h2:   vec![0x22; 32],
      h3:   vec![0x33; 32],
      shts: vec![0; 32], // overwritten below with the real cross-check value
    }
  }

  #[test]
  fn derive_is_deterministic() {
    let s = secrets();
    let a = KdcOutput::derive(&s).unwrap();
    let b = KdcOutput::derive(&s).unwrap();
    assert_eq!(a.dhs_in, b.dhs_in);
    assert_eq!(a.server.key, b.server.key);
    assert_eq!(a.client.iv, b.client.iv);
  }

  #[test]
  fn directions_differ() {
    let out = KdcOutput::derive(&secrets()).unwrap();
    assert_ne!(out.server.xats, out.client.xats);
    assert_ne!(out.server.key, out.client.key);
  }

  #[test]
  fn key_and_iv_sizes() {
    let out = KdcOutput::derive(&secrets()).unwrap();
    assert_eq!(hex::decode(&out.server.key).unwrap().len(), 16);
    assert_eq!(hex::decode(&out.server.iv).unwrap().len(), 12);
  }

  #[test]
  fn shts_cross_check_round_trips() {
    let mut s = secrets();
    let out = KdcOutput::derive(&s).unwrap();
    let msg_in = hex::decode(&out.shts_in).unwrap();
    let shts = finalize_from_state(opad_state(&s.hs), 64, &msg_in);
    s.shts = shts.to_vec();
    let out2 = KdcOutput::derive(&s).unwrap();
    assert!(out2.verify_shts(&s).is_ok());
  }

  #[test]
  fn shts_mismatch_is_detected() {
    let s = secrets();
    let out = KdcOutput::derive(&s).unwrap();
    assert!(matches!(out.verify_shts(&s), Err(ProofError::ShtsMismatch)));
  }

  #[test]
  fn hash_key_matches_sha256_of_key() {
    let out = KdcOutput::derive(&secrets()).unwrap();
    let key = hex::decode(&out.server.key).unwrap();
    let expect = to_hex(&Sha256::digest(&key));
    assert_eq!(out.server.hash_key, expect);
  }
}
