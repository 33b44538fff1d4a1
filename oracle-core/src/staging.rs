//! Single staging directory threaded through every stage (§9 design note
//! "Global staging paths"), replacing the hard-coded `./local_storage/...`
//! strings in the original source.

use std::path::{Path, PathBuf};

/// Root of the on-disk artifact tree for one prover invocation. Constructed
/// once from [`crate::session`]-external configuration and passed by
/// reference into every downstream component instead of each one
/// hard-coding a path.
#[derive(Debug, Clone)]
pub struct StagingDir {
  root: PathBuf,
}

impl StagingDir {
  /// Roots a staging directory at `root`. Does not create it; callers that
  /// write artifacts are responsible for `std::fs::create_dir_all`.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// `kdc_shared.json` (§6).
  pub fn kdc_shared(&self) -> PathBuf { self.root.join("kdc_shared.json") }

  /// `kdc_public_input.json` (§6).
  pub fn kdc_public_input(&self) -> PathBuf { self.root.join("kdc_public_input.json") }

  /// `kdc_private_input.json` (§6).
  pub fn kdc_private_input(&self) -> PathBuf { self.root.join("kdc_private_input.json") }

  /// `recordtag_public_input.json` (§6).
  pub fn recordtag_public_input(&self) -> PathBuf { self.root.join("recordtag_public_input.json") }

  /// `recorddata_public_input.json` (§6).
  pub fn recorddata_public_input(&self) -> PathBuf {
    self.root.join("recorddata_public_input.json")
  }

  /// `recorddata_private_input.json` (§6).
  pub fn recorddata_private_input(&self) -> PathBuf {
    self.root.join("recorddata_private_input.json")
  }

  /// `final_params.json`, the flattened merge of every artifact above, kept
  /// for audit (§6).
  pub fn final_params(&self) -> PathBuf { self.root.join("final_params.json") }

  /// Debug-oriented full per-direction dump (`skdc_params.json` /
  /// `ckdc_params.json`, §6 / `SPEC_FULL.md` §12). `direction` is `"s"` or
  /// `"c"`.
  pub fn kdc_debug_dump(&self, direction: &str) -> PathBuf {
    self.root.join(format!("{direction}kdc_params.json"))
  }

  /// `circuits/` subdirectory holding the compiled constraint system,
  /// proving/verifying keys, and the final proof.
  pub fn circuits_dir(&self) -> PathBuf { self.root.join("circuits") }

  /// `circuits/proof.pk`, the proving key received from the verifier (C7).
  pub fn proving_key(&self) -> PathBuf { self.circuits_dir().join("proof.pk") }

  /// `circuits/oracle_<backend>.proof`, the final serialized proof.
  pub fn proof_file(&self, backend: &str) -> PathBuf {
    self.circuits_dir().join(format!("oracle_{backend}.proof"))
  }

  /// The staging root itself.
  pub fn root(&self) -> &Path { &self.root }

  /// Creates the staging root and its `circuits/` subdirectory if missing.
  pub fn ensure_dirs(&self) -> std::io::Result<()> {
    std::fs::create_dir_all(self.circuits_dir())
  }

  /// Writes a one-way debug dump for `direction` (`"s"` or `"c"`), e.g. the
  /// full per-direction KDC intermediate values. Never read back by any
  /// stage; purely for offline inspection (`SPEC_FULL.md` §12).
  pub fn dump_debug(&self, direction: &str, value: &impl serde::Serialize) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(value)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(self.kdc_debug_dump(direction), json)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn paths_are_rooted_correctly() {
    let s = StagingDir::new("/tmp/oracle-staging");
    assert_eq!(s.kdc_shared(), Path::new("/tmp/oracle-staging/kdc_shared.json"));
    assert_eq!(s.proving_key(), Path::new("/tmp/oracle-staging/circuits/proof.pk"));
    assert_eq!(s.proof_file("groth16"), Path::new("/tmp/oracle-staging/circuits/oracle_groth16.proof"));
    assert_eq!(s.kdc_debug_dump("s"), Path::new("/tmp/oracle-staging/skdc_params.json"));
  }

  #[test]
  fn dump_debug_writes_readable_json() {
    let dir = std::env::temp_dir().join(format!("oracle-staging-test-{}", std::process::id()));
    let s = StagingDir::new(&dir);
    s.ensure_dirs().unwrap();
    s.dump_debug("s", &serde_json::json!({ "hashKeySapp": "aabb" })).unwrap();
    let raw = std::fs::read_to_string(s.kdc_debug_dump("s")).unwrap();
    assert!(raw.contains("hashKeySapp"));
    std::fs::remove_dir_all(&dir).ok();
  }
}
