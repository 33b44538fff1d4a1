//! The captured TLS 1.3 session (C1 Session Reader).
//!
//! Loads `session_params_13.json` (§6): a map of per-record identifiers to
//! record contents, plus a `"keys"` entry holding the handshake secrets. The
//! forked TLS 1.3 stack that produces this file is an external collaborator
//! (§1) — this module only reads what it writes.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::OracleCoreError;

/// Which phase of the handshake/record stream a [`Record`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
  /// Handshake record.
  #[serde(rename = "HS")]
  Handshake,
  /// Server Finished record.
  #[serde(rename = "SF")]
  ServerFinished,
  /// Server application-data record.
  #[serde(rename = "SR")]
  ServerRecord,
}

/// One TLS record captured during the session: its wire ciphertext, AEAD
/// additional data, and (once decrypted by the collaborator) plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  /// Record type.
  #[serde(rename = "typ")]
  pub typ: RecordType,
  /// Record sequence number within its direction (§3: "the record index
  /// within its direction"). Not part of the wire record shape (§6) — the
  /// session file carries `{typ, additionalData, payload, ciphertext}` only
  /// — so this is never read from JSON; [`Session::from_json`] derives it
  /// after loading from each record's position among same-typed records in
  /// sorted key order (see [`BTreeMap`]'s deterministic iteration, used for
  /// exactly this reason).
  #[serde(skip)]
  pub sequence_number: u64,
  /// AEAD additional authenticated data, hex-encoded on the wire.
  #[serde(rename = "additionalData", with = "hex_bytes")]
  pub additional_data: Vec<u8>,
  /// Decrypted payload, hex-encoded on the wire.
  #[serde(with = "hex_bytes")]
  pub payload: Vec<u8>,
  /// Wire ciphertext, hex-encoded on the wire.
  #[serde(with = "hex_bytes")]
  pub ciphertext: Vec<u8>,
}

impl Record {
  /// The record's sequence number as 8 big-endian bytes (§3).
  pub fn sequence_bytes(&self) -> [u8; 8] { self.sequence_number.to_be_bytes() }

  /// The record's sequence number as lower-case hex, matching the key shape
  /// used in `recordtag_public_input.json` (§4.2).
  pub fn sequence_hex(&self) -> String { hex::encode(self.sequence_bytes()) }
}

/// Handshake secrets shared across the session (§3), as read from the
/// session file's `"keys"` object. `SHTS` is kept for the cross-check only
/// (§12 of `SPEC_FULL.md`); the ladder itself never reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSecrets {
  /// Handshake Secret, 32 bytes.
  #[serde(rename = "HS", with = "hex_bytes")]
  pub hs: Vec<u8>,
  /// Transcript hash after ServerHello, 32 bytes.
  #[serde(rename = "H2", with = "hex_bytes")]
  pub h2: Vec<u8>,
  /// Transcript hash at end-of-handshake, 32 bytes.
  #[serde(rename = "H3", with = "hex_bytes")]
  pub h3: Vec<u8>,
  /// Server Handshake Traffic Secret, used only to cross-check the derived
  /// ladder.
  #[serde(rename = "SHTS", with = "hex_bytes")]
  pub shts: Vec<u8>,
}

impl SessionSecrets {
  /// Validates that every secret is exactly 32 bytes.
  pub fn validate(&self) -> Result<(), OracleCoreError> {
    for (name, v) in
      [("HS", &self.hs), ("H2", &self.h2), ("H3", &self.h3), ("SHTS", &self.shts)]
    {
      if v.len() != 32 {
        return Err(OracleCoreError::InvalidSession(format!(
          "{name} must be 32 bytes, got {}",
          v.len()
        )));
      }
    }
    Ok(())
  }
}

/// A fully loaded session: the shared secrets plus every captured record,
/// keyed by the opaque per-record identifier used in the session file. Kept
/// as a `BTreeMap` rather than a `HashMap` so every stage that scans
/// `records` (directly or via [`Session::server_records`]) sees a fixed,
/// reproducible order across runs — a `HashMap`'s randomized iteration order
/// would let `find_matching_record` pick a different record, and therefore
/// emit different staging artifacts and proofs, from one invocation to the
/// next whenever more than one server record is present (§8's determinism
/// property).
#[derive(Debug, Clone)]
pub struct Session {
  /// Handshake secrets.
  pub secrets: SessionSecrets,
  /// Records, keyed by their storage identifier, in sorted key order.
  pub records: BTreeMap<String, Record>,
}

impl Session {
  /// Loads and validates a session file (§6).
  pub fn load(path: impl AsRef<Path>) -> Result<Self, OracleCoreError> {
    let raw = std::fs::read_to_string(path)?;
    Self::from_json(&raw)
  }

  /// Parses a session file already read into memory.
  pub fn from_json(raw: &str) -> Result<Self, OracleCoreError> {
    let mut value: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    let keys = value
      .remove("keys")
      .ok_or_else(|| OracleCoreError::InvalidSession("missing \"keys\" object".into()))?;
    let secrets: SessionSecrets = serde_json::from_value(keys)?;
    secrets.validate()?;

    let mut records = BTreeMap::new();
    for (id, v) in value {
      let record: Record = serde_json::from_value(v)?;
      records.insert(id, record);
    }
    assign_sequence_numbers(&mut records);
    tracing::debug!(record_count = records.len(), "loaded session");
    Ok(Self { secrets, records })
  }

  /// Every server application-data record (`type == SR`), in sorted key
  /// order (reproducible across runs, unlike a `HashMap`'s iteration order).
  pub fn server_records(&self) -> impl Iterator<Item = (&String, &Record)> {
    self.records.iter().filter(|(_, r)| r.typ == RecordType::ServerRecord)
  }
}

/// Assigns each record's `sequence_number` as its 0-based position among
/// same-typed records, in `records`' sorted key order. TLS 1.3 resets the
/// record sequence counter every time a direction starts using a new set of
/// traffic keys, so handshake, Server Finished, and server application-data
/// records each count from zero independently (§3).
fn assign_sequence_numbers(records: &mut BTreeMap<String, Record>) {
  let (mut handshake, mut server_finished, mut server_record) = (0u64, 0u64, 0u64);
  for record in records.values_mut() {
    let counter = match record.typ {
      RecordType::Handshake => &mut handshake,
      RecordType::ServerFinished => &mut server_finished,
      RecordType::ServerRecord => &mut server_record,
    };
    record.sequence_number = *counter;
    *counter += 1;
  }
}

mod hex_bytes {
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(d)?;
    hex::decode(s).map_err(serde::de::Error::custom)
  }
}
