//! # grain-distribution — Cred-to-Grain allocation engine.
//!
//! Consumes externally computed Cred scores and turns a grain budget into
//! a conservation-checked [`Distribution`](grain_core::Distribution) under
//! a chosen policy:
//! - **IMMEDIATE**: proportional to Cred since the last distribution.
//! - **BALANCED**: proportional to lifetime underpayment, converging total
//!   payouts toward the cumulative Cred distribution.
//!
//! All allocation arithmetic is integer-only for determinism.

pub mod cred;
pub mod engine;

pub use cred::{CredHistory, CredInterval};
pub use engine::compute_distribution;
