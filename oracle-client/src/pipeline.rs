//! Orchestrates C1-C7 end to end: load the captured session, re-derive keys
//! (C2), locate the policy's match among the server records (C3/C4),
//! assemble the witness (C5), drive the SNARK backend with a proving key
//! fetched from the verifier (C6), and submit the finished proof (C7).

use oracle_core::{policy::Policy, session::Session};
use oracle_proofs::{backend::ProofDriver, kdc::KdcOutput, locator::LocatedRecordData, tag::RecordTag, witness};

use crate::{config::Config, error::ClientError, transport::VerifierClient};

/// Summary of one successful pipeline run, returned for logging/testing.
#[derive(Debug)]
pub struct PipelineOutcome {
  /// Identifier of the server record the policy matched against.
  pub record_id: String,
  /// Whether the extracted value satisfied the policy's threshold.
  pub policy_satisfied: bool,
  /// Final proof, as submitted to the verifier.
  pub proof_bytes: Vec<u8>,
}

/// Runs the full pipeline for one (session, policy) pair, as loaded from
/// `config`. `show_plaintext` prints the matching record's decrypted
/// payload before proving (never done unless explicitly requested).
pub async fn run(config: &Config, show_plaintext: bool) -> Result<PipelineOutcome, ClientError> {
  let staging = config.staging_dir();
  staging.ensure_dirs()?;

  let session = Session::load(&config.session_path)?;
  let policy: Policy = serde_json::from_str(&std::fs::read_to_string(&config.policy_path)?)?;
  policy.validate()?;

  let kdc = KdcOutput::derive(&session.secrets)?;
  kdc.verify_shts(&session.secrets)?;

  if config.dump_kdc_debug {
    staging.dump_debug("s", &kdc.server)?;
    staging.dump_debug("c", &kdc.client)?;
  }
  std::fs::write(staging.kdc_shared(), serde_json::to_vec_pretty(&kdc)?)?;

  // §4.1: kdc_public_input.json / kdc_private_input.json split the same
  // ladder output `kdc_shared.json` already carries in full, named after
  // exactly the fields the verifier needs versus the one the prover keeps.
  std::fs::write(
    staging.kdc_public_input(),
    serde_json::to_vec_pretty(&serde_json::json!({
      "intermediateHashHSopad": kdc.intermediate_hash_hs_opad,
      "MSin": kdc.ms_in,
      "SATSin": kdc.server.xats_in,
      "CATSin": kdc.client.xats_in,
      "tkSAPPin": kdc.server.tk_xapp_in,
      "tkCAPPin": kdc.client.tk_xapp_in,
      "ivSapp": kdc.server.iv,
      "ivCapp": kdc.client.iv,
      "hashKeySapp": kdc.server.hash_key,
      "hashKeyCapp": kdc.client.hash_key,
    }))?,
  )?;
  std::fs::write(
    staging.kdc_private_input(),
    serde_json::to_vec_pretty(&serde_json::json!({ "dHSin": kdc.dhs_in }))?,
  )?;

  let (record_id, located, record) = find_matching_record(&session, &policy)?;
  tracing::info!(record_id = %record_id, "policy substring located");

  let plain_chunks = hex::decode(&located.plain_chunks)?;
  let value_bytes = &plain_chunks[located.value_start..located.value_end];
  let value: u64 = std::str::from_utf8(value_bytes)
    .map_err(|e| ClientError::InvalidConfig(format!("policy value is not UTF-8: {e}")))?
    .trim()
    .parse()
    .map_err(|e| ClientError::InvalidConfig(format!("policy value is not decimal: {e}")))?;
  let policy_satisfied = policy.value_constraint.evaluate(value, policy.threshold()?);

  if show_plaintext {
    println!("matched record {record_id} plaintext:\n{}", String::from_utf8_lossy(&record.payload));
  }

  let server_key = hex::decode(&kdc.server.key)?;
  let server_iv = hex::decode(&kdc.server.iv)?;
  let tag = RecordTag::build(&server_key, &server_iv, record.sequence_number)?;
  std::fs::write(staging.recordtag_public_input(), serde_json::to_vec_pretty(&tag)?)?;

  let witness = witness::assemble(&kdc, &tag, &located, record.sequence_number)?;
  witness::verify_ctr_consistency(&server_key, &witness)?;
  std::fs::write(staging.recorddata_public_input(), serde_json::to_vec_pretty(&witness.public)?)?;
  std::fs::write(staging.recorddata_private_input(), serde_json::to_vec_pretty(&witness.private)?)?;

  std::fs::write(
    staging.final_params(),
    serde_json::to_vec_pretty(&serde_json::json!({
      "kdc": kdc,
      "recordtag": tag,
      "recorddata": located,
    }))?,
  )?;

  let backend = config.backend()?;
  let verifier = VerifierClient::new(config.verifier_base_url());
  let pk_bytes = verifier
    .postprocess(
      &serde_json::to_value(&kdc)?,
      &serde_json::to_value(&tag)?,
      &serde_json::to_value(&located)?,
      &witness.public,
    )
    .await?;
  std::fs::write(staging.proving_key(), &pk_bytes)?;

  let proof_bytes = ProofDriver::assign(witness)
    .compile(&backend)?
    .load_pk(&pk_bytes)?
    .prove()?
    .serialize()?
    .into_proof_bytes()?;

  oracle_proofs::proof::write_proof(staging.root(), &backend, &proof_bytes)?;
  verifier.verify(&proof_bytes).await?;

  Ok(PipelineOutcome { record_id, policy_satisfied, proof_bytes })
}

/// Scans every server record for one matching the policy's substring,
/// skipping records where the substring is absent or the area of interest
/// doesn't fit (fatal for that record only). Fatal overall only if no
/// record matches at all.
fn find_matching_record<'a>(
  session: &'a Session,
  policy: &Policy,
) -> Result<(String, LocatedRecordData, &'a oracle_core::session::Record), ClientError> {
  for (id, record) in session.server_records() {
    match oracle_proofs::locator::locate(policy, &record.payload, &record.ciphertext) {
      Ok(located) => return Ok((id.clone(), located, record)),
      Err(oracle_proofs::errors::ProofError::SubstringNotFound(_)) => continue,
      Err(oracle_proofs::errors::ProofError::OutOfBounds(_)) => continue,
      Err(e) => return Err(e.into()),
    }
  }
  Err(ClientError::NoMatchingRecord)
}
