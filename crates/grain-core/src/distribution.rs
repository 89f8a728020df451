//! Distribution records: one atomic minting of a grain budget across
//! identities according to an allocation policy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::amount::{GrainAmount, checked_sum};
use crate::error::{AmountError, LedgerError};
use crate::identity::IdentityId;

/// An opaque 16-byte distribution identifier, rendered as 32 hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistributionId([u8; 16]);

impl DistributionId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create an id from a byte array.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for DistributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for DistributionId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| LedgerError::MalformedLogEntry {
            line: 0,
            reason: format!("invalid distribution id: {s}"),
        })?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| LedgerError::MalformedLogEntry {
            line: 0,
            reason: format!("distribution id must be 16 bytes: {s}"),
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for DistributionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DistributionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// How a distribution's budget was allocated.
///
/// The variant is stored in the ledger event, so historical distributions
/// remain auditable against their policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationPolicy {
    /// Allocate proportionally to Cred earned since the last distribution.
    /// Rewards recent activity; ignores lifetime history.
    Immediate {
        /// Total budget minted by this distribution, in atomic units.
        budget: GrainAmount,
    },
    /// Allocate toward each identity's lifetime-Cred fair share, paying
    /// more to identities whose historical payout lags their historical
    /// Cred. Over many rounds payouts converge to the cumulative Cred
    /// distribution.
    Balanced {
        /// Total budget minted by this distribution, in atomic units.
        budget: GrainAmount,
    },
}

impl AllocationPolicy {
    /// The budget this policy was asked to allocate.
    pub fn budget(&self) -> GrainAmount {
        match self {
            Self::Immediate { budget } | Self::Balanced { budget } => *budget,
        }
    }
}

/// An immutable record of one budget allocation across identities.
///
/// The allocation map is a `BTreeMap` so serialization order is
/// deterministic; zero shares may be represented explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Unique distribution identifier.
    pub id: DistributionId,
    /// When the distribution was computed, in ms since the epoch.
    pub timestamp_ms: i64,
    /// The policy that produced the allocations.
    pub policy: AllocationPolicy,
    /// Per-identity grain grants. Must sum to the policy's budget.
    pub allocations: BTreeMap<IdentityId, GrainAmount>,
}

impl Distribution {
    /// Sum of all allocations.
    ///
    /// # Errors
    ///
    /// [`AmountError::ArithmeticOverflow`] if the sum exceeds `u128`.
    pub fn total(&self) -> Result<GrainAmount, AmountError> {
        checked_sum(self.allocations.values().copied())
    }

    /// Check conservation: allocations must sum exactly to the declared
    /// budget, with no remainder lost or invented.
    ///
    /// # Errors
    ///
    /// [`LedgerError::BudgetMismatch`] if the sums differ.
    pub fn verify_total(&self) -> Result<(), LedgerError> {
        let total = self.total()?;
        let budget = self.policy.budget();
        if total != budget {
            return Err(LedgerError::BudgetMismatch {
                declared: budget.atoms(),
                allocated: total.atoms(),
            });
        }
        Ok(())
    }
}
