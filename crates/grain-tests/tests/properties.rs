//! Property tests over generated operation sequences.
//!
//! Each case drives a ledger through an arbitrary mix of creates,
//! distributions, transfers, toggles, renames and merges, then checks the
//! global invariants: grain is conserved (balances and lifetime earnings
//! both sum to exactly what was minted), failed operations change nothing,
//! and replaying the produced log is bit-identical to the original run.

use std::collections::BTreeMap;

use proptest::prelude::*;

use grain_core::amount::GrainAmount;
use grain_core::identity::{IdentityId, IdentitySubtype};
use grain_ledger::{Ledger, LedgerOptions};
use grain_tests::helpers::*;

#[derive(Clone, Debug)]
enum Op {
    Create,
    Distribute(Vec<u8>),
    Transfer { from: u8, to: u8, amount: u8 },
    Toggle { target: u8, active: bool },
    Merge { into: u8, from: u8 },
    Rename { target: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Create),
        3 => proptest::collection::vec(any::<u8>(), 1..6).prop_map(Op::Distribute),
        2 => (any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        1 => (any::<u8>(), any::<bool>()).prop_map(|(target, active)| Op::Toggle { target, active }),
        1 => (any::<u8>(), any::<u8>()).prop_map(|(into, from)| Op::Merge { into, from }),
        1 => any::<u8>().prop_map(|target| Op::Rename { target }),
    ]
}

/// Alive canonical ids in deterministic (ascending) order.
fn alive_ids(ledger: &Ledger) -> Vec<IdentityId> {
    let mut ids: Vec<IdentityId> = ledger.accounts().map(|a| a.identity.id).collect();
    ids.sort();
    ids
}

/// Drive a ledger through the ops. Returns the ledger and the exact total
/// ever minted through distributions.
fn run_ops(ops: &[Op]) -> (Ledger, u128) {
    let mut ledger = fresh_ledger();
    let mut fresh_names = 0usize;
    let mut minted: u128 = 0;

    for (step, op) in ops.iter().enumerate() {
        let ts = step as i64 + 1;
        let ids = alive_ids(&ledger);
        match op {
            Op::Create => {
                ledger
                    .create_identity_at(
                        name(&format!("user-{fresh_names}")),
                        IdentitySubtype::Person,
                        ts,
                    )
                    .unwrap();
                fresh_names += 1;
            }
            Op::Distribute(weights) => {
                if ids.is_empty() {
                    continue;
                }
                let mut allocations: BTreeMap<IdentityId, GrainAmount> = BTreeMap::new();
                for (i, &w) in weights.iter().enumerate() {
                    let id = ids[i % ids.len()];
                    let entry = allocations.entry(id).or_insert(GrainAmount::ZERO);
                    *entry = entry.checked_add(atoms(w as u128)).unwrap();
                }
                let total: u128 = allocations.values().map(|a| a.atoms()).sum();
                if total == 0 {
                    continue;
                }
                ledger
                    .distribute_grain_at(
                        manual_distribution(allocations.into_iter().collect(), ts),
                        ts,
                    )
                    .unwrap();
                minted += total;
            }
            Op::Transfer { from, to, amount } => {
                if ids.is_empty() {
                    continue;
                }
                let from = ids[*from as usize % ids.len()];
                let to = ids[*to as usize % ids.len()];
                let log_len = ledger.event_log().len();
                let result =
                    ledger.transfer_grain_at(from, to, atoms(*amount as u128), None, ts);
                if result.is_err() {
                    // Rejected events must leave the log untouched.
                    assert_eq!(ledger.event_log().len(), log_len);
                }
            }
            Op::Toggle { target, active } => {
                if ids.is_empty() {
                    continue;
                }
                let id = ids[*target as usize % ids.len()];
                ledger.set_active_at(id, *active, ts).unwrap();
            }
            Op::Merge { into, from } => {
                if ids.len() < 2 {
                    continue;
                }
                let into = ids[*into as usize % ids.len()];
                let from = ids[*from as usize % ids.len()];
                if into == from {
                    continue;
                }
                ledger.merge_identities_at(into, from, ts).unwrap();
            }
            Op::Rename { target } => {
                if ids.is_empty() {
                    continue;
                }
                let id = ids[*target as usize % ids.len()];
                ledger
                    .rename_identity_at(id, name(&format!("user-{fresh_names}")), ts)
                    .unwrap();
                fresh_names += 1;
            }
        }
    }
    (ledger, minted)
}

fn account_snapshot(ledger: &Ledger) -> BTreeMap<IdentityId, grain_ledger::Account> {
    ledger
        .accounts()
        .map(|a| (a.identity.id, a.clone()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn grain_is_conserved(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let (ledger, minted) = run_ops(&ops);
        let balance_total: u128 = ledger.accounts().map(|a| a.balance.atoms()).sum();
        let paid_total: u128 = ledger.accounts().map(|a| a.paid.atoms()).sum();
        // Transfers and merges move grain around; only distributions mint.
        prop_assert_eq!(balance_total, minted);
        prop_assert_eq!(paid_total, minted);
    }

    #[test]
    fn replay_matches_original(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let (ledger, _) = run_ops(&ops);
        let replayed = Ledger::from_event_log(
            ledger.event_log().entries().to_vec(),
            LedgerOptions::default(),
        ).unwrap();
        prop_assert_eq!(account_snapshot(&replayed), account_snapshot(&ledger));
        prop_assert_eq!(
            replayed.event_log().to_json_lines().unwrap(),
            ledger.event_log().to_json_lines().unwrap()
        );
    }

    #[test]
    fn json_roundtrip_matches_original(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let (ledger, _) = run_ops(&ops);
        let text = ledger.event_log().to_json_lines().unwrap();
        let restored = Ledger::from_json_lines(&text, LedgerOptions::default()).unwrap();
        prop_assert_eq!(account_snapshot(&restored), account_snapshot(&ledger));
    }
}
