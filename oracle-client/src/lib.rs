//! # `oracle-client`
//!
//! The prover-side CLI: loads a captured session and policy, drives the
//! C1-C7 pipeline, and submits the resulting proof to a verifier.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod transport;
