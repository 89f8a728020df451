//! Integration and property test suite for the Grain ledger.
//!
//! The suites exercise the ledger's replay, conservation and merge
//! invariants end to end, including the distribution engine's policies
//! driving the ledger the way the production pipeline does.

pub mod helpers;
