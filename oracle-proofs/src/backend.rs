//! # Proof Driver (C6)
//!
//! Drives the SNARK backend through the state machine the original source
//! exposes: `Idle -> Witnessed -> Compiled -> Ready -> Proven -> Done`. The
//! only backend wired to an actual prove/verify path is Groth16 on BN254;
//! the PLONK variants are kept as named branches that fail fast, since
//! their SRS is not distributed with this crate (§4.5, §9).

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem, SynthesisError};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;
use ark_std::rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::{circuit::OracleCircuit, errors::ProofError, witness::WitnessAssignment};

/// An opaque structured reference string, required by the PLONK branches
/// but never populated by this crate (§4.5).
#[derive(Debug, Clone)]
pub struct Srs(pub Vec<u8>);

/// Which SNARK backend a [`ProofDriver`] targets.
#[derive(Debug, Clone)]
pub enum Backend {
  /// The only backend with a working prove/verify path.
  Groth16,
  /// PLONK with a KZG-style SRS. Not implemented: no SRS ships with this
  /// crate.
  Plonk(Srs),
  /// PLONK with an FRI-based polynomial commitment, transparent setup.
  PlonkFri,
}

impl Backend {
  /// A short identifier used in staging file names (`oracle_<backend>.proof`).
  pub fn tag(&self) -> &'static str {
    match self {
      Backend::Groth16 => "groth16",
      Backend::Plonk(_) => "plonk",
      Backend::PlonkFri => "plonk_fri",
    }
  }
}

/// Per-invocation proof-driver state, mirroring §4.5's state diagram. Each
/// state carries exactly the data the next transition needs; an invalid
/// transition is a programming error caught by the type system rather than
/// a runtime check.
pub enum ProofDriver {
  /// No witness assigned yet.
  Idle,
  /// `assign` has produced a witness over BN254.
  Witnessed(WitnessAssignment),
  /// `compile` has built the constraint system.
  Compiled { witness: WitnessAssignment, num_constraints: usize },
  /// `load_pk` has deserialized the proving key received from the verifier.
  Ready { witness: WitnessAssignment, pk: ProvingKey<Bn254> },
  /// `prove` has produced a proof.
  Proven(Proof<Bn254>),
  /// The proof has been serialized for transport.
  Done(Vec<u8>),
}

impl ProofDriver {
  /// `assign`: wraps an assembled witness, entering the `Witnessed` state.
  pub fn assign(witness: WitnessAssignment) -> Self { ProofDriver::Witnessed(witness) }

  /// `compile`: builds the constraint system for the witness and counts its
  /// constraints, entering the `Compiled` state. Only Groth16 is supported;
  /// any other backend fails with `snark.compile`.
  pub fn compile(self, backend: &Backend) -> Result<Self, ProofError> {
    let witness = match self {
      ProofDriver::Witnessed(w) => w,
      _ => return Err(ProofError::Compile("compile requires the Witnessed state".into())),
    };
    match backend {
      Backend::Groth16 => {
        let cs = ConstraintSystem::<Fr>::new_ref();
        OracleCircuit::new(witness.clone())
          .generate_constraints(cs.clone())
          .map_err(|e: SynthesisError| ProofError::Compile(e.to_string()))?;
        let num_constraints = cs.num_constraints();
        Ok(ProofDriver::Compiled { witness, num_constraints })
      }
      Backend::Plonk(_) | Backend::PlonkFri => {
        Err(ProofError::Compile("PLONK backends require an SRS not distributed with this build".into()))
      }
    }
  }

  /// `load_pk`: deserializes a proving key received from the verifier
  /// (C7), entering the `Ready` state.
  pub fn load_pk(self, pk_bytes: &[u8]) -> Result<Self, ProofError> {
    let witness = match self {
      ProofDriver::Compiled { witness, .. } => witness,
      _ => return Err(ProofError::Compile("load_pk requires the Compiled state".into())),
    };
    let pk = ProvingKey::<Bn254>::deserialize_compressed(pk_bytes)?;
    Ok(ProofDriver::Ready { witness, pk })
  }

  /// `prove`: runs Groth16 proving over the witness and proving key,
  /// entering the `Proven` state. The RNG is seeded deterministically from
  /// the witness's canonical JSON so repeated runs over the same inputs are
  /// byte-identical (§8 scenario S5), rather than drawn from OS entropy.
  pub fn prove(self) -> Result<Self, ProofError> {
    let (witness, pk) = match self {
      ProofDriver::Ready { witness, pk } => (witness, pk),
      _ => return Err(ProofError::Compile("prove requires the Ready state".into())),
    };
    let mut rng = seeded_rng(&witness)?;
    let circuit = OracleCircuit::new(witness);
    let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng)?;
    Ok(ProofDriver::Proven(proof))
  }

  /// `serialize`: canonically serializes the proof, entering the `Done`
  /// state.
  pub fn serialize(self) -> Result<Self, ProofError> {
    let proof = match self {
      ProofDriver::Proven(p) => p,
      _ => return Err(ProofError::Compile("serialize requires the Proven state".into())),
    };
    let mut bytes = Vec::new();
    ark_serialize::CanonicalSerialize::serialize_compressed(&proof, &mut bytes)?;
    Ok(ProofDriver::Done(bytes))
  }

  /// Returns the serialized proof if the driver has reached `Done`.
  pub fn into_proof_bytes(self) -> Result<Vec<u8>, ProofError> {
    match self {
      ProofDriver::Done(bytes) => Ok(bytes),
      _ => Err(ProofError::Compile("proof requested before the Done state".into())),
    }
  }
}

/// Derives a deterministic RNG seed from the witness's canonical JSON
/// encoding (§8 scenario S5: reproducible Groth16 proofs across runs over
/// identical inputs).
fn seeded_rng(witness: &WitnessAssignment) -> Result<ChaCha8Rng, ProofError> {
  let json = serde_json::to_vec(witness)?;
  let digest = Sha256::digest(&json);
  let mut seed = [0u8; 32];
  seed.copy_from_slice(&digest);
  Ok(ChaCha8Rng::from_seed(seed))
}

/// A trivial RNG wrapper kept only so `ark_std::rand::RngCore` stays in
/// scope for callers that need to generate a fresh Groth16 setup locally
/// (e.g. in tests, where no verifier is available to hand out a real
/// proving key).
pub fn test_only_setup(circuit_template: WitnessAssignment) -> Result<(ProvingKey<Bn254>, ark_groth16::VerifyingKey<Bn254>), ProofError> {
  let mut rng = seeded_rng(&circuit_template)?;
  let circuit = OracleCircuit::new(circuit_template);
  let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng)?;
  Ok((pk, vk))
}

#[cfg(test)]
mod tests {
  use oracle_core::session::SessionSecrets;

  use super::*;
  use crate::{kdc::KdcOutput, locator::locate, tag::RecordTag, witness::assemble};

  fn sample_witness() -> WitnessAssignment {
    let secrets = SessionSecrets { hs: vec![0x11; 32], h2: vec![0x22; 32], h3: vec![0x33; 32], shts: vec![0; 32] };
    let kdc = KdcOutput::derive(&secrets).unwrap();
    let tag = RecordTag::build(&[0u8; 16], &[0u8; 12], 0).unwrap();

    let mut payload = b"balance\":\"12345\"".to_vec();
    payload.extend(std::iter::repeat(b'y').take(16));
    let cipher = vec![0u8; payload.len()];
    let policy = oracle_core::policy::Policy {
      substring: "balance\":".into(),
      value_start_idx_after_ss: 2,
      value_length: 5,
      threshold_value: "10000".into(),
      value_constraint: oracle_core::policy::ValueConstraint::Gt,
    };
    let located = locate(&policy, &payload, &cipher).unwrap();
    assemble(&kdc, &tag, &located, 0).unwrap()
  }

  #[test]
  fn compile_counts_constraints_for_groth16() {
    let driver = ProofDriver::assign(sample_witness());
    let driver = driver.compile(&Backend::Groth16).unwrap();
    match driver {
      ProofDriver::Compiled { num_constraints, .. } => assert!(num_constraints == 0 || num_constraints > 0),
      _ => panic!("expected Compiled"),
    }
  }

  #[test]
  fn plonk_compile_is_rejected() {
    let driver = ProofDriver::assign(sample_witness());
    let err = driver.compile(&Backend::PlonkFri).unwrap_err();
    assert!(matches!(err, ProofError::Compile(_)));
  }

  #[test]
  fn seeded_rng_is_deterministic_for_identical_witnesses() {
    let w = sample_witness();
    let mut a = seeded_rng(&w).unwrap();
    let mut b = seeded_rng(&w).unwrap();
    assert_eq!(a.next_u64(), b.next_u64());
  }

  #[test]
  fn end_to_end_groth16_round_trip() {
    let witness = sample_witness();
    let (pk, _vk) = test_only_setup(witness.clone()).unwrap();
    let mut pk_bytes = Vec::new();
    ark_serialize::CanonicalSerialize::serialize_compressed(&pk, &mut pk_bytes).unwrap();

    let driver = ProofDriver::assign(witness)
      .compile(&Backend::Groth16)
      .unwrap()
      .load_pk(&pk_bytes)
      .unwrap()
      .prove()
      .unwrap()
      .serialize()
      .unwrap();
    let proof_bytes = driver.into_proof_bytes().unwrap();
    assert!(!proof_bytes.is_empty());
  }
}
