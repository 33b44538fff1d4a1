//! # Oracle Prover Core
//!
//! `oracle-core` is the data-model crate for the oracle-style zero-knowledge
//! proof prover: a captured TLS 1.3 session (handshake secrets plus
//! application-data records) together with the policy predicate a proof is
//! generated against.
//!
//! ## Modules
//!
//! - [`error`]: crate error type
//! - [`session`]: captured session, records, and secrets (C1 Session Reader)
//! - [`policy`]: the policy predicate evaluated against a record's plaintext
//! - [`fixed_bytes`]: zero-padding fixed-size byte array builder used by the
//!   witness assembler
//! - [`staging`]: on-disk layout shared by every downstream stage

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

pub mod error;
pub mod fixed_bytes;
pub mod policy;
pub mod session;
pub mod staging;
