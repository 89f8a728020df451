//! Distribution policy behaviour across multiple rounds.

use grain_core::amount::GrainAmount;
use grain_core::distribution::AllocationPolicy;
use grain_core::error::DistributionError;
use grain_distribution::compute_distribution;
use grain_tests::helpers::*;

#[test]
fn balanced_corrects_historical_skew() {
    let (mut ledger, alice, bob) = two_person_ledger();
    // A lopsided manual payout: alice got everything so far.
    ledger
        .distribute_grain_at(manual_distribution(vec![(alice, grain(60))], 5), 5)
        .unwrap();

    // Lifetime cred is actually even.
    let history = cred(vec![(10, vec![(alice, 2.0), (bob, 2.0)])]);
    let distribution = compute_distribution(
        AllocationPolicy::Balanced { budget: grain(40) },
        &history,
        &ledger,
        10,
    )
    .unwrap();
    ledger.distribute_grain_at(distribution, 10).unwrap();

    // Fair share of the 100g pool is 50g each; bob was 50g behind and
    // receives the whole round.
    assert_eq!(ledger.account(alice).unwrap().paid, grain(60));
    assert_eq!(ledger.account(bob).unwrap().paid, grain(40));
}

#[test]
fn balanced_converges_to_cred_shares_over_rounds() {
    let (mut ledger, alice, bob) = two_person_ledger();
    let history = cred(vec![(1, vec![(alice, 3.0), (bob, 1.0)])]);

    for round in 1..=5 {
        let timestamp = round * 10;
        let distribution = compute_distribution(
            AllocationPolicy::Balanced { budget: grain(100) },
            &history,
            &ledger,
            timestamp,
        )
        .unwrap();
        ledger.distribute_grain_at(distribution, timestamp).unwrap();
    }

    // 500g distributed against a 3:1 cred ratio.
    assert_eq!(ledger.account(alice).unwrap().paid, grain(375));
    assert_eq!(ledger.account(bob).unwrap().paid, grain(125));
}

#[test]
fn immediate_window_resets_each_round() {
    let (mut ledger, alice, bob) = two_person_ledger();
    let history = cred(vec![
        (10, vec![(alice, 10.0)]),
        (20, vec![(bob, 1.0)]),
    ]);

    // At the first round only the first interval has been scored yet.
    let first = compute_distribution(
        AllocationPolicy::Immediate { budget: grain(10) },
        &cred(vec![(10, vec![(alice, 10.0)])]),
        &ledger,
        10,
    )
    .unwrap();
    ledger.distribute_grain_at(first, 10).unwrap();
    assert_eq!(ledger.account(alice).unwrap().paid, grain(10));

    // Alice's earlier cred no longer counts; bob takes the whole round.
    let second = compute_distribution(
        AllocationPolicy::Immediate { budget: grain(10) },
        &history,
        &ledger,
        20,
    )
    .unwrap();
    assert_eq!(second.allocations[&bob], grain(10));
    assert!(!second.allocations.contains_key(&alice));
}

#[test]
fn engine_rejects_empty_rounds() {
    let (ledger, _, _) = two_person_ledger();
    let empty = cred(vec![]);
    let err = compute_distribution(
        AllocationPolicy::Immediate { budget: grain(10) },
        &empty,
        &ledger,
        10,
    )
    .unwrap_err();
    assert_eq!(err, DistributionError::NoEligibleRecipients);
}

#[test]
fn single_atom_budget_is_not_lost() {
    let (mut ledger, alice, bob) = two_person_ledger();
    let history = cred(vec![(10, vec![(alice, 1.0), (bob, 1.0)])]);
    let distribution = compute_distribution(
        AllocationPolicy::Immediate {
            budget: GrainAmount::from_atoms(1),
        },
        &history,
        &ledger,
        10,
    )
    .unwrap();
    // One atom cannot split; the tie-break hands it to the lower id.
    let total = distribution
        .allocations
        .values()
        .copied()
        .try_fold(GrainAmount::ZERO, GrainAmount::checked_add)
        .unwrap();
    assert_eq!(total, GrainAmount::from_atoms(1));
    ledger.distribute_grain_at(distribution, 10).unwrap();
}
