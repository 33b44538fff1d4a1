//! Proof persistence: writes the serialized proof produced by
//! [`crate::backend::ProofDriver`] to the staging directory (§4.5, §6).

use std::path::Path;

use crate::{backend::Backend, errors::ProofError};

/// Writes `proof_bytes` to `circuits/oracle_<backend>.proof` under
/// `staging_root`.
pub fn write_proof(staging_root: &Path, backend: &Backend, proof_bytes: &[u8]) -> Result<(), ProofError> {
  let circuits_dir = staging_root.join("circuits");
  std::fs::create_dir_all(&circuits_dir)?;
  let path = circuits_dir.join(format!("oracle_{}.proof", backend.tag()));
  std::fs::write(path, proof_bytes)?;
  Ok(())
}

/// Reads back a previously written proof, for verification-path testing.
pub fn read_proof(staging_root: &Path, backend: &Backend) -> Result<Vec<u8>, ProofError> {
  let path = staging_root.join("circuits").join(format!("oracle_{}.proof", backend.tag()));
  Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn writes_and_reads_back_the_same_bytes() {
    let dir = std::env::temp_dir().join(format!("oracle-proof-test-{}", std::process::id()));
    write_proof(&dir, &Backend::Groth16, b"fake-proof-bytes").unwrap();
    let read_back = read_proof(&dir, &Backend::Groth16).unwrap();
    assert_eq!(read_back, b"fake-proof-bytes");
    std::fs::remove_dir_all(&dir).ok();
  }
}
