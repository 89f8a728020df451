//! The account projection: an identity's derived balance and lifetime
//! earnings. Accounts are read-only views maintained by the ledger fold,
//! never stored independently of the event log.

use serde::{Deserialize, Serialize};

use grain_core::amount::GrainAmount;
use grain_core::identity::Identity;

/// Derived per-identity state after folding a log prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The identity this account belongs to (canonical, post-merge).
    pub identity: Identity,
    /// Whether the identity may receive new allocations.
    pub active: bool,
    /// Current spendable balance: distributions received plus transfers
    /// in, minus transfers out. Never negative.
    pub balance: GrainAmount,
    /// Lifetime total ever received through distributions. Monotonically
    /// non-decreasing; merges move this history, they never duplicate it.
    pub paid: GrainAmount,
}

impl Account {
    /// Fresh account for a newly created identity: active, empty.
    pub(crate) fn new(identity: Identity) -> Self {
        Self {
            identity,
            active: true,
            balance: GrainAmount::ZERO,
            paid: GrainAmount::ZERO,
        }
    }
}
