//! CLI configuration (§11): the verifier's host/port, the staging directory
//! root, and the backend selection, deserialized from a JSON file path
//! given on the command line — mirroring the teacher's own `Config` /
//! builder-ish accessor pattern.

use std::path::PathBuf;

use oracle_core::staging::StagingDir;
use oracle_proofs::backend::{Backend, Srs};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Which SNARK backend a pipeline run should target. Mirrors
/// [`oracle_proofs::backend::Backend`] but stays plain data so it can be
/// deserialized from JSON; `Config::backend` converts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
  /// Groth16 on BN254 — the only backend with a working prove path.
  Groth16,
  /// PLONK with a KZG-style SRS, read from `srs_path`.
  Plonk {
    /// Path to the structured reference string.
    srs_path: PathBuf,
  },
  /// PLONK with an FRI-based, transparent-setup commitment.
  PlonkFri,
}

/// The prover invocation's configuration, loaded once from a JSON file
/// given on the CLI (§11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Verifier's HTTP host, e.g. `"verifier.example.com"`.
  pub verifier_host: String,
  /// Verifier's HTTP port.
  pub verifier_port: u16,
  /// Whether the verifier endpoint is reachable over TLS.
  #[serde(default = "default_verifier_https")]
  pub verifier_https: bool,
  /// Root of the staging directory every stage reads/writes under.
  pub staging_root: PathBuf,
  /// Path to the captured `session_params_13.json`.
  pub session_path: PathBuf,
  /// Path to the policy file.
  pub policy_path: PathBuf,
  /// Which backend to drive.
  pub backend: BackendChoice,
  /// Whether to write the optional per-direction KDC debug dumps
  /// (`SPEC_FULL.md` §12). Off by default: these are purely diagnostic.
  #[serde(default)]
  pub dump_kdc_debug: bool,
}

fn default_verifier_https() -> bool { true }

impl Config {
  /// Loads and parses a configuration file.
  pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ClientError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
  }

  /// The verifier's base URL, e.g. `https://verifier.example.com:8443`.
  pub fn verifier_base_url(&self) -> String {
    let scheme = if self.verifier_https { "https" } else { "http" };
    format!("{scheme}://{}:{}", self.verifier_host, self.verifier_port)
  }

  /// Builds the [`StagingDir`] rooted at [`Config::staging_root`].
  pub fn staging_dir(&self) -> StagingDir { StagingDir::new(self.staging_root.clone()) }

  /// Converts [`Config::backend`] into the `oracle-proofs` backend type,
  /// reading the SRS from disk for the PLONK variant.
  pub fn backend(&self) -> Result<Backend, ClientError> {
    Ok(match &self.backend {
      BackendChoice::Groth16 => Backend::Groth16,
      BackendChoice::Plonk { srs_path } => {
        let bytes = std::fs::read(srs_path)?;
        Backend::Plonk(Srs(bytes))
      }
      BackendChoice::PlonkFri => Backend::PlonkFri,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_json() -> &'static str {
    r#"{
      "verifier_host": "verifier.example.com",
      "verifier_port": 8443,
      "staging_root": "/tmp/oracle-staging",
      "session_path": "session_params_13.json",
      "policy_path": "policy.json",
      "backend": "groth16"
    }"#
  }

  #[test]
  fn parses_minimal_config_with_defaults() {
    let config: Config = serde_json::from_str(sample_json()).unwrap();
    assert!(config.verifier_https);
    assert!(!config.dump_kdc_debug);
    assert_eq!(config.verifier_base_url(), "https://verifier.example.com:8443");
  }

  #[test]
  fn groth16_backend_choice_converts() {
    let config: Config = serde_json::from_str(sample_json()).unwrap();
    assert!(matches!(config.backend().unwrap(), Backend::Groth16));
  }
}
