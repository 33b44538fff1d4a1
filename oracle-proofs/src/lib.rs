//! # `oracle-proofs`
//!
//! Everything downstream of the captured session: key-schedule
//! re-derivation (C2), the per-record GCM tag building blocks (C3), the
//! policy locator (C4), the witness assembler (C5), and the SNARK proof
//! driver (C6).

#![warn(missing_docs)]

pub mod backend;
pub mod circuit;
pub mod errors;
pub mod kdc;
pub mod locator;
pub mod proof;
pub mod tag;
pub mod witness;
