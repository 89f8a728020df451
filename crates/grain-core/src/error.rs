//! Error types for the Grain ledger.
use thiserror::Error;

use crate::identity::IdentityId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u128, need: u128 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("division by zero weight total")] ZeroDenominator,
    #[error("invalid amount string: {0}")] ParseAmount(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("timestamp {got} precedes last event timestamp {last}")] TimeOrdering { last: i64, got: i64 },
    #[error("unknown identity: {0}")] UnknownIdentity(IdentityId),
    #[error("identity already merged away: {0}")] AlreadyMerged(IdentityId),
    #[error("cannot merge an identity into itself: {0}")] SelfMerge(IdentityId),
    #[error("identity id already used: {0}")] IdReused(IdentityId),
    #[error("name already taken: {0}")] NameTaken(String),
    #[error("invalid identity name: {0}")] InvalidName(String),
    #[error("allocations sum to {allocated}, declared budget is {declared}")] BudgetMismatch { declared: u128, allocated: u128 },
    #[error("malformed log entry at line {line}: {reason}")] MalformedLogEntry { line: usize, reason: String },
    #[error("serialization: {0}")] Serialization(String),
    #[error("replay failed at sequence {sequence}: {source}")] ReplayFailed { sequence: u64, source: Box<LedgerError> },
    #[error(transparent)] Amount(#[from] AmountError),
}

// Not `Eq`: `InvalidCredScore` carries the offending f64.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistributionError {
    #[error("invalid cred score for identity {id}: {score}")] InvalidCredScore { id: IdentityId, score: f64 },
    #[error("no active identity has positive weight under this policy")] NoEligibleRecipients,
    #[error("distribution budget is zero")] EmptyBudget,
    #[error(transparent)] Amount(#[from] AmountError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrainError {
    #[error(transparent)] Amount(#[from] AmountError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Distribution(#[from] DistributionError),
}
