//! # Record Tag Builder (C3)
//!
//! Reconstructs the two GCM authentication-tag building blocks under the
//! derived `key_Sapp`/`iv_Sapp` pair: the pre-counter block used to mask the
//! tag (`ECB0`) and the GHASH subkey (`ECBK`).
//!
//! ```text
//! ECB0 = AES-128-ENC(key_Sapp, nonce(iv_Sapp, seq) ‖ 0x00000001)
//! ECBK = AES-128-ENC(key_Sapp, 0^16)
//! ```
//!
//! The per-record nonce is built per RFC 8446 §5.3: the 8-byte big-endian
//! sequence number is XORed into the low 8 bytes of the 12-byte IV, for
//! every sequence number, not only the all-zero one (§9 design note — this
//! corrects a known bug in the original source, which only performed the
//! XOR when the record's sequence key happened to equal the all-zero hex
//! string and otherwise left the nonce zeroed).

use aes::{
  cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
  Aes128,
};
use serde::{Deserialize, Serialize};

use crate::errors::ProofError;

/// `ECB0`/`ECBK` for one record, keyed by its sequence number in
/// `recordtag_public_input.json` (§4.2, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTag {
  /// `AES-128-ENC(key_Sapp, nonce ‖ 0x00000001)`, the GCM pre-counter block.
  pub ecb0: String,
  /// `AES-128-ENC(key_Sapp, 0^16)`, the GHASH subkey `H`.
  pub ecbk: String,
}

/// Builds the RFC 8446 §5.3 per-record nonce: `iv` with the big-endian
/// sequence number XORed into its low 8 bytes. Applied unconditionally,
/// fixing the original source's all-zero-sequence special case.
fn record_nonce(iv: &[u8; 12], seq: u64) -> [u8; 12] {
  let mut nonce = *iv;
  let seq_bytes = seq.to_be_bytes();
  for (n, s) in nonce[4..].iter_mut().zip(seq_bytes.iter()) {
    *n ^= *s;
  }
  nonce
}

fn aes128_encrypt_block(key: &[u8; 16], block: [u8; 16]) -> [u8; 16] {
  let cipher = Aes128::new(GenericArray::from_slice(key));
  let mut block = GenericArray::clone_from_slice(&block);
  cipher.encrypt_block(&mut block);
  block.into()
}

impl RecordTag {
  /// Computes `ECB0`/`ECBK` for one record's sequence number, given the
  /// derived 16-byte AEAD key and 12-byte IV (§4.2).
  pub fn build(key: &[u8], iv: &[u8], seq: u64) -> Result<Self, ProofError> {
    let key: [u8; 16] = key
      .try_into()
      .map_err(|_| ProofError::SizeOverflow(format!("key_Sapp must be 16 bytes, got {}", key.len())))?;
    let iv: [u8; 12] = iv
      .try_into()
      .map_err(|_| ProofError::SizeOverflow(format!("iv_Sapp must be 12 bytes, got {}", iv.len())))?;

    let nonce = record_nonce(&iv, seq);
    let mut counter_block = [0u8; 16];
    counter_block[..12].copy_from_slice(&nonce);
    counter_block[12..].copy_from_slice(&1u32.to_be_bytes());

    let ecb0 = aes128_encrypt_block(&key, counter_block);
    let ecbk = aes128_encrypt_block(&key, [0u8; 16]);
    tracing::debug!(seq, "built record tag");

    Ok(Self { ecb0: hex::encode(ecb0), ecbk: hex::encode(ecbk) })
  }
}
