//! Cred score inputs.
//!
//! Cred is computed by an external scoring pipeline and arrives here as
//! opaque per-identity, per-interval numeric scores. The engine never
//! recomputes Cred; it only windows and sums it.

use std::collections::BTreeMap;

use grain_core::error::DistributionError;
use grain_core::identity::IdentityId;

/// Cred scores for one scoring interval.
#[derive(Clone, Debug, PartialEq)]
pub struct CredInterval {
    /// End of the interval, in ms since the epoch.
    pub end_ms: i64,
    /// Per-identity Cred earned within the interval.
    pub scores: BTreeMap<IdentityId, f64>,
}

/// A time-ordered sequence of Cred intervals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CredHistory {
    intervals: Vec<CredInterval>,
}

impl CredHistory {
    /// Build a history from intervals, sorting them by interval end.
    ///
    /// # Errors
    ///
    /// [`DistributionError::InvalidCredScore`] if any score is NaN,
    /// infinite, or negative.
    pub fn new(mut intervals: Vec<CredInterval>) -> Result<Self, DistributionError> {
        for interval in &intervals {
            for (&id, &score) in &interval.scores {
                if !score.is_finite() || score < 0.0 {
                    return Err(DistributionError::InvalidCredScore { id, score });
                }
            }
        }
        intervals.sort_by_key(|i| i.end_ms);
        Ok(Self { intervals })
    }

    /// The validated intervals, in ascending end order.
    pub fn intervals(&self) -> &[CredInterval] {
        &self.intervals
    }

    /// Per-identity Cred summed over intervals ending strictly after
    /// `cutoff_ms`. `None` means no cutoff: sum everything.
    ///
    /// Summation iterates sorted maps in sorted interval order, so the
    /// result is deterministic for a given history.
    pub fn scores_after(&self, cutoff_ms: Option<i64>) -> BTreeMap<IdentityId, f64> {
        let mut totals: BTreeMap<IdentityId, f64> = BTreeMap::new();
        for interval in &self.intervals {
            if let Some(cutoff) = cutoff_ms {
                if interval.end_ms <= cutoff {
                    continue;
                }
            }
            for (&id, &score) in &interval.scores {
                *totals.entry(id).or_insert(0.0) += score;
            }
        }
        totals
    }

    /// Per-identity lifetime Cred across every interval.
    pub fn lifetime_scores(&self) -> BTreeMap<IdentityId, f64> {
        self.scores_after(None)
    }
}
