//! Verifier Transport Client (C7).
//!
//! Two plain request/response calls, no retry or streaming: the public
//! witness material goes out over `POST {verifier}/postprocess` and comes
//! back as a raw proving key, and the finished proof goes out over
//! `POST {verifier}/verify` as an opaque byte blob.

use oracle_proofs::witness::PublicWitness;
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::ClientError;

/// Thin client over the verifier's HTTP surface.
#[derive(Debug, Clone)]
pub struct VerifierClient {
  base_url: String,
  http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct PostprocessRequest<'a> {
  kdc_shared: &'a serde_json::Value,
  recordtag_public: &'a serde_json::Value,
  recorddata_public: &'a serde_json::Value,
  kdc_public_input: &'a PublicWitness,
}

impl VerifierClient {
  /// Builds a client talking to `base_url` (no trailing slash), e.g.
  /// `"https://verifier.example.com:8443"`.
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), http: reqwest::Client::new() }
  }

  /// `POST /postprocess`: sends the public witness artifacts, receives the
  /// proving key bytes the verifier compiled for this circuit instance.
  pub async fn postprocess(
    &self,
    kdc_shared: &serde_json::Value,
    recordtag_public: &serde_json::Value,
    recorddata_public: &serde_json::Value,
    kdc_public_input: &PublicWitness,
  ) -> Result<Vec<u8>, ClientError> {
    let body =
      PostprocessRequest { kdc_shared, recordtag_public, recorddata_public, kdc_public_input };
    let response =
      self.http.post(format!("{}/postprocess", self.base_url)).json(&body).send().await?;
    let response = reject_non_2xx(response).await?;
    Ok(response.bytes().await?.to_vec())
  }

  /// `POST /verify`: sends the serialized proof as `application/octet-stream`.
  /// A 2xx response means the verifier accepted it; anything else is a
  /// rejection, with the reason taken from the response body.
  pub async fn verify(&self, proof_bytes: &[u8]) -> Result<(), ClientError> {
    let response = self
      .http
      .post(format!("{}/verify", self.base_url))
      .header("Content-Type", "application/octet-stream")
      .body(proof_bytes.to_vec())
      .send()
      .await?;
    reject_non_2xx(response).await?;
    Ok(())
  }
}

async fn reject_non_2xx(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
  if response.status().is_success() {
    return Ok(response);
  }
  let status: StatusCode = response.status();
  let reason = response.text().await.unwrap_or_default();
  Err(ClientError::VerifierRejected(format!("{status}: {reason}")))
}

#[cfg(test)]
mod tests {
  use httpmock::prelude::*;

  use super::*;

  #[tokio::test]
  async fn postprocess_returns_proving_key_bytes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
      when.method(POST).path("/postprocess");
      then.status(200).body(vec![1u8, 2, 3, 4]);
    });

    let client = VerifierClient::new(server.base_url());
    let witness = sample_public_witness();
    let bytes = client
      .postprocess(
        &serde_json::json!({}),
        &serde_json::json!({}),
        &serde_json::json!({}),
        &witness,
      )
      .await
      .unwrap();
    assert_eq!(bytes, vec![1, 2, 3, 4]);
    mock.assert();
  }

  #[tokio::test]
  async fn verify_rejects_non_2xx_with_reason() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(POST).path("/verify");
      then.status(400).body("bad proof");
    });

    let client = VerifierClient::new(server.base_url());
    let err = client.verify(&[0u8; 4]).await.unwrap_err();
    match err {
      ClientError::VerifierRejected(reason) => assert!(reason.contains("bad proof")),
      other => panic!("expected VerifierRejected, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn verify_accepts_2xx() {
    let server = MockServer::start();
    server.mock(|when, then| {
      when.method(POST).path("/verify");
      then.status(200);
    });

    let client = VerifierClient::new(server.base_url());
    client.verify(&[0u8; 4]).await.unwrap();
  }

  fn sample_public_witness() -> PublicWitness {
    use oracle_core::fixed_bytes::FixedBytes;
    PublicWitness {
      intermediate_hash_hs_opad: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      ms_in: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      sats_in: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      cats_in: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      tk_sapp_in: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      tk_capp_in: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      iv_sapp: FixedBytes::from_slice(&[0u8; 12]).unwrap(),
      iv_capp: FixedBytes::from_slice(&[0u8; 12]).unwrap(),
      hash_key_sapp: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      hash_key_capp: FixedBytes::from_slice(&[0u8; 32]).unwrap(),
      ecb0: FixedBytes::from_slice(&[0u8; 16]).unwrap(),
      ecbk: FixedBytes::from_slice(&[0u8; 16]).unwrap(),
      chunk_index: 2,
      substring: b"balance\":".to_vec(),
      substring_start_idx: 0,
      number_chunks: 1,
      size_area_of_interest: 10,
      size_value: 5,
      cipher_chunks: vec![0u8; 16],
      substring_start: 0,
      substring_end: 9,
      value_start: 9,
      value_end: 14,
      sequence_number: FixedBytes::from_slice(&[0u8; 8]).unwrap(),
    }
  }
}
