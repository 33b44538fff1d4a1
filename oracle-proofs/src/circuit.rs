//! # Oracle circuit wrapper (part of C6)
//!
//! Wraps a [`WitnessAssignment`] as an `ark-relations` [`ConstraintSynthesizer`]
//! so it can be compiled and proven over BN254. Allocating the witness as
//! circuit variables is everything this crate owns; the SHA-256/AES gadget
//! logic that actually constrains those variables against each other is an
//! external collaborator (§1 Non-goals) — this wrapper only assigns values,
//! the same division of labor the original source's `CircuitAssign` keeps
//! between itself and the external `gnark` circuit package.

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ark_std::vec::Vec;

use crate::witness::WitnessAssignment;

/// Allocates one field element per byte of `bytes`, in the circuit's
/// witness (private) or instance (public) namespace depending on `public`.
fn alloc_bytes(
  cs: &ConstraintSystemRef<Fr>,
  bytes: &[u8],
  public: bool,
) -> Result<Vec<ark_relations::r1cs::Variable>, SynthesisError> {
  bytes
    .iter()
    .map(|b| {
      let value = Fr::from(*b as u64);
      if public {
        cs.new_input_variable(|| Ok(value))
      } else {
        cs.new_witness_variable(|| Ok(value))
      }
    })
    .collect()
}

/// The oracle proving circuit: one constraint-system variable per byte of
/// every public and private witness field, with no constraints of its own.
/// Downstream SHA-256/AES/GCM gadgets (out of scope here) constrain these
/// variables against each other; this struct exists to hand them a
/// consistently-ordered variable set.
pub struct OracleCircuit {
  /// The assembled witness this circuit instantiates.
  pub witness: WitnessAssignment,
}

impl OracleCircuit {
  /// Wraps an assembled witness for compilation/proving.
  pub fn new(witness: WitnessAssignment) -> Self { Self { witness } }
}

impl ConstraintSynthesizer<Fr> for OracleCircuit {
  fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
    let public = &self.witness.public;
    let private = &self.witness.private;

    alloc_bytes(&cs, public.intermediate_hash_hs_opad.as_bytes(), true)?;
    alloc_bytes(&cs, public.ms_in.as_bytes(), true)?;
    alloc_bytes(&cs, public.sats_in.as_bytes(), true)?;
    alloc_bytes(&cs, public.cats_in.as_bytes(), true)?;
    alloc_bytes(&cs, public.tk_sapp_in.as_bytes(), true)?;
    alloc_bytes(&cs, public.tk_capp_in.as_bytes(), true)?;
    alloc_bytes(&cs, public.iv_sapp.as_bytes(), true)?;
    alloc_bytes(&cs, public.iv_capp.as_bytes(), true)?;
    alloc_bytes(&cs, public.hash_key_sapp.as_bytes(), true)?;
    alloc_bytes(&cs, public.hash_key_capp.as_bytes(), true)?;
    alloc_bytes(&cs, public.ecb0.as_bytes(), true)?;
    alloc_bytes(&cs, public.ecbk.as_bytes(), true)?;
    alloc_bytes(&cs, &public.substring, true)?;
    alloc_bytes(&cs, &public.cipher_chunks, true)?;
    alloc_bytes(&cs, public.sequence_number.as_bytes(), true)?;

    alloc_bytes(&cs, private.dhs_in.as_bytes(), false)?;
    alloc_bytes(&cs, private.iv_counter.as_bytes(), false)?;
    alloc_bytes(&cs, private.zeros.as_bytes(), false)?;
    alloc_bytes(&cs, &private.plain_chunks, false)?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use ark_relations::r1cs::ConstraintSystem;
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
  fn circuit_allocates_without_error() {
    let cs = ConstraintSystem::<Fr>::new_ref();
    let circuit = OracleCircuit::new(sample_witness());
    circuit.generate_constraints(cs.clone()).unwrap();
    assert!(cs.num_witness_variables() > 0);
    assert!(cs.num_instance_variables() > 0);
  }
}
