//! # grain-core
//! Foundation types for the Grain ledger: exact currency amounts,
//! contributor identities, ledger events, and distribution records.

pub mod amount;
pub mod constants;
pub mod distribution;
pub mod error;
pub mod event;
pub mod identity;

pub use amount::{GrainAmount, checked_sum, split_budget};
pub use distribution::{AllocationPolicy, Distribution, DistributionId};
pub use error::{AmountError, DistributionError, GrainError, LedgerError};
pub use event::{Action, LedgerEvent};
pub use identity::{Identity, IdentityId, IdentityName, IdentitySubtype};
