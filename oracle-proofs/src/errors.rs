//! Error type for the `oracle-proofs` crate.
//!
//! Variant names follow the error-kind taxonomy: each covers one stage of
//! the pipeline (KDC re-derivation, tag building, policy location, witness
//! assembly, or the SNARK backend itself).

use thiserror::Error;

/// Errors produced while re-deriving keys, locating a policy match, or
/// driving the SNARK backend.
#[derive(Debug, Error)]
pub enum ProofError {
  /// Propagated from the data-model layer (session/policy loading).
  #[error(transparent)]
  Core(#[from] oracle_core::error::OracleCoreError),

  /// A required secret was missing or had the wrong size.
  #[error("kdc.invalid_session: {0}")]
  InvalidSession(String),

  /// `SHTS` recomputed from the ladder did not match the session's
  /// recorded value.
  #[error("kdc.invalid_session: SHTS cross-check failed")]
  ShtsMismatch,

  /// AES-CTR-decrypting `cipher_chunks` under the derived key/counter did
  /// not reproduce the captured `plain_chunks` (§8 testable property 2).
  #[error("kdc.invalid_session: AES-CTR decryption of cipher_chunks under the derived key does not match the captured plaintext")]
  CtrMismatch,

  /// The policy's substring was not found in any server record.
  #[error("policy.substring_not_found: {0:?}")]
  SubstringNotFound(String),

  /// The policy's area of interest extends past the end of the payload.
  #[error("policy.out_of_bounds: {0}")]
  OutOfBounds(String),

  /// A value did not fit the fixed-size array the circuit declares for it.
  #[error("witness.size_overflow: {0}")]
  SizeOverflow(String),

  /// Circuit compilation failed.
  #[error("snark.compile: {0}")]
  Compile(String),

  /// Proof generation failed.
  #[error("snark.prove: {0}")]
  Prove(#[from] ark_relations::r1cs::SynthesisError),

  /// Proof verification failed locally (distinct from the verifier's own
  /// rejection over the wire, which is a transport-layer concern).
  #[error("snark.verify: {0}")]
  Verify(String),

  /// (De)serialization of a proof or key failed.
  #[error(transparent)]
  Serialize(#[from] ark_serialize::SerializationError),

  /// A staging artifact could not be read or written.
  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  /// A staging artifact was not valid JSON.
  #[error("parse.json: {0}")]
  Json(#[from] serde_json::Error),
}
