//! Error type for the `oracle-client` crate: orchestration, transport, and
//! configuration failures that don't belong to the data-model or proving
//! layers.

use thiserror::Error;

/// Errors produced while loading configuration, running the C1-C7 pipeline,
/// or talking to the verifier.
#[derive(Debug, Error)]
pub enum ClientError {
  /// Propagated from `oracle-core` (session/policy loading).
  #[error(transparent)]
  Core(#[from] oracle_core::error::OracleCoreError),

  /// Propagated from `oracle-proofs` (KDC/tag/locator/witness/backend).
  #[error(transparent)]
  Proof(#[from] oracle_proofs::errors::ProofError),

  /// The configuration file was missing a required field or held an
  /// invalid value.
  #[error("config.invalid: {0}")]
  InvalidConfig(String),

  /// A staging artifact could not be read or written.
  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  /// A staging artifact was not valid JSON.
  #[error("parse.json: {0}")]
  Json(#[from] serde_json::Error),

  /// A hex-encoded field did not decode.
  #[error("parse.hex: {0}")]
  Hex(#[from] hex::FromHexError),

  /// The verifier rejected a request or the connection failed.
  #[error("transport.http: {0}")]
  Transport(#[from] reqwest::Error),

  /// The verifier returned a non-2xx status.
  #[error("transport.http: verifier rejected the request: {0}")]
  VerifierRejected(String),

  /// No server record in the session matched the policy.
  #[error("policy.substring_not_found: no server record matched the policy")]
  NoMatchingRecord,
}
