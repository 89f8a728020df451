//! Shared test helpers for the integration suites.

use std::collections::BTreeMap;

use grain_core::amount::GrainAmount;
use grain_core::distribution::{AllocationPolicy, Distribution, DistributionId};
use grain_core::identity::{IdentityId, IdentityName, IdentitySubtype};
use grain_distribution::{CredHistory, CredInterval};
use grain_ledger::{Ledger, LedgerOptions};

/// Validated name from a literal.
pub fn name(s: &str) -> IdentityName {
    IdentityName::new(s).unwrap()
}

/// Deterministic identity id from a seed byte.
pub fn iid(seed: u8) -> IdentityId {
    IdentityId::from_bytes([seed; 16])
}

/// A whole-grain amount.
pub fn grain(whole: u64) -> GrainAmount {
    GrainAmount::from_grain(whole).unwrap()
}

/// A raw atomic-unit amount.
pub fn atoms(n: u128) -> GrainAmount {
    GrainAmount::from_atoms(n)
}

/// Empty ledger with default options.
pub fn fresh_ledger() -> Ledger {
    Ledger::new(LedgerOptions::default())
}

/// Ledger with `alice` and `bob` created at timestamp 0.
pub fn two_person_ledger() -> (Ledger, IdentityId, IdentityId) {
    let mut ledger = fresh_ledger();
    let alice = ledger
        .create_identity_at(name("alice"), IdentitySubtype::Person, 0)
        .unwrap();
    let bob = ledger
        .create_identity_at(name("bob"), IdentitySubtype::Person, 0)
        .unwrap();
    (ledger, alice, bob)
}

/// Build a cred history from `(interval_end_ms, [(identity, score)])` rows.
pub fn cred(entries: Vec<(i64, Vec<(IdentityId, f64)>)>) -> CredHistory {
    CredHistory::new(
        entries
            .into_iter()
            .map(|(end_ms, scores)| CredInterval {
                end_ms,
                scores: scores.into_iter().collect(),
            })
            .collect(),
    )
    .unwrap()
}

/// Hand-built distribution with an IMMEDIATE policy descriptor whose
/// budget equals the allocation sum.
pub fn manual_distribution(
    allocations: Vec<(IdentityId, GrainAmount)>,
    timestamp_ms: i64,
) -> Distribution {
    let allocations: BTreeMap<IdentityId, GrainAmount> = allocations.into_iter().collect();
    let budget = allocations
        .values()
        .copied()
        .try_fold(GrainAmount::ZERO, GrainAmount::checked_add)
        .unwrap();
    Distribution {
        id: DistributionId::random(),
        timestamp_ms,
        policy: AllocationPolicy::Immediate { budget },
        allocations,
    }
}
