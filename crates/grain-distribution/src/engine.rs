//! The distribution engine: turns Cred scores and a policy into a
//! conservation-checked [`Distribution`].
//!
//! All allocation arithmetic is integer-only for determinism. Incoming
//! floating-point Cred is converted exactly once to micro-Cred weights
//! ([`CRED_PRECISION`]); everything downstream is exact integer math via
//! [`split_budget`], so repeated runs over the same inputs produce
//! identical allocations.

use std::collections::BTreeMap;

use tracing::debug;

use grain_core::amount::{GrainAmount, split_budget};
use grain_core::constants::CRED_PRECISION;
use grain_core::distribution::{AllocationPolicy, Distribution, DistributionId};
use grain_core::error::DistributionError;
use grain_core::identity::IdentityId;
use grain_ledger::Ledger;

use crate::cred::CredHistory;

/// Compute a distribution of `policy`'s budget over `cred`, against the
/// ledger's current account snapshot.
///
/// The result is pure data: hand it to [`Ledger::distribute_grain`] to
/// commit it as one atomic event. Identities are canonicalized through the
/// ledger's merge chains, so Cred attributed to a merged-away identity
/// counts for the identity it was merged into. Inactive identities receive
/// zero (under `Balanced` their Cred still weighs in the denominators);
/// identities unknown to the ledger are kept as recipients and left for
/// the ledger's onboarding rules to accept or reject.
///
/// # Errors
///
/// - [`DistributionError::EmptyBudget`] for a zero budget
/// - [`DistributionError::InvalidCredScore`] for NaN/infinite/negative Cred
/// - [`DistributionError::NoEligibleRecipients`] when no active identity
///   carries positive weight under the policy
pub fn compute_distribution(
    policy: AllocationPolicy,
    cred: &CredHistory,
    ledger: &Ledger,
    timestamp_ms: i64,
) -> Result<Distribution, DistributionError> {
    let budget = policy.budget();
    if budget.is_zero() {
        return Err(DistributionError::EmptyBudget);
    }

    let weights = match policy {
        AllocationPolicy::Immediate { .. } => immediate_weights(cred, ledger)?,
        AllocationPolicy::Balanced { budget } => balanced_weights(cred, ledger, budget)?,
    };
    if weights.values().all(|&w| w == 0) {
        return Err(DistributionError::NoEligibleRecipients);
    }

    // BTreeMap iteration gives ascending identity-id order, which fixes
    // the remainder tie-break.
    let ids: Vec<IdentityId> = weights.keys().copied().collect();
    let weight_values: Vec<u128> = weights.values().copied().collect();
    let shares = split_budget(budget, &weight_values)?;
    let allocations: BTreeMap<IdentityId, GrainAmount> =
        ids.into_iter().zip(shares).collect();

    debug!(
        recipients = allocations.len(),
        budget = %budget,
        "distribution computed"
    );
    Ok(Distribution {
        id: DistributionId::random(),
        timestamp_ms,
        policy,
        allocations,
    })
}

/// Convert a summed Cred score to an integer micro-Cred weight.
fn micro_cred(id: IdentityId, score: f64) -> Result<u128, DistributionError> {
    if !score.is_finite() || score < 0.0 {
        return Err(DistributionError::InvalidCredScore { id, score });
    }
    Ok((score * CRED_PRECISION as f64).round() as u128)
}

/// Whether an identity may receive a share: active, or unknown to the
/// ledger (onboarding is the ledger's call). Merged-away ids never get
/// here — scores are canonicalized first.
fn is_eligible(ledger: &Ledger, id: IdentityId) -> bool {
    match ledger.account(id) {
        Ok(account) => account.active,
        Err(_) => ledger.canonical(id).is_none(),
    }
}

/// Fold raw scores onto canonical identities.
fn canonicalize(
    ledger: &Ledger,
    scores: BTreeMap<IdentityId, f64>,
) -> BTreeMap<IdentityId, f64> {
    let mut folded: BTreeMap<IdentityId, f64> = BTreeMap::new();
    for (id, score) in scores {
        let canonical = ledger.canonical(id).unwrap_or(id);
        *folded.entry(canonical).or_insert(0.0) += score;
    }
    folded
}

/// IMMEDIATE: weight is Cred earned strictly since the last distribution.
fn immediate_weights(
    cred: &CredHistory,
    ledger: &Ledger,
) -> Result<BTreeMap<IdentityId, u128>, DistributionError> {
    let recent = canonicalize(ledger, cred.scores_after(ledger.last_distribution_timestamp()));
    let mut weights = BTreeMap::new();
    for (id, score) in recent {
        if !is_eligible(ledger, id) {
            continue;
        }
        weights.insert(id, micro_cred(id, score)?);
    }
    Ok(weights)
}

/// BALANCED: weight is lifetime underpayment against the fair share
/// `T * cred_i / total_cred`, where `T` is all grain ever distributed plus
/// this budget. Identities whose payout history lags their Cred history
/// get proportionally more, converging payouts toward the cumulative Cred
/// distribution over repeated rounds.
///
/// Inactive identities contribute their Cred (and received grain) to the
/// totals but take no share this round.
fn balanced_weights(
    cred: &CredHistory,
    ledger: &Ledger,
    budget: GrainAmount,
) -> Result<BTreeMap<IdentityId, u128>, DistributionError> {
    let lifetime = canonicalize(ledger, cred.lifetime_scores());

    let mut total_cred: u128 = 0;
    let mut micro: BTreeMap<IdentityId, u128> = BTreeMap::new();
    for (&id, &score) in &lifetime {
        let w = micro_cred(id, score)?;
        total_cred = total_cred
            .checked_add(w)
            .ok_or(grain_core::error::AmountError::ArithmeticOverflow)?;
        micro.insert(id, w);
    }
    if total_cred == 0 {
        return Err(DistributionError::NoEligibleRecipients);
    }

    let mut total_paid = GrainAmount::ZERO;
    for account in ledger.accounts() {
        total_paid = total_paid.checked_add(account.paid)?;
    }
    let target_pool = total_paid.checked_add(budget)?;

    let mut weights = BTreeMap::new();
    for (id, w) in micro {
        if !is_eligible(ledger, id) {
            continue;
        }
        let (fair_share, _) = target_pool.mul_div(w, total_cred)?;
        let paid = ledger
            .account(id)
            .map(|a| a.paid)
            .unwrap_or(GrainAmount::ZERO);
        let underpaid = fair_share.atoms().saturating_sub(paid.atoms());
        weights.insert(id, underpaid);
    }
    Ok(weights)
}
