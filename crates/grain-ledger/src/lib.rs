//! # grain-ledger
//! Event-sourced ledger for the Grain currency: an append-only event log
//! and the pure fold that derives identities, balances, and distribution
//! history from it.

pub mod account;
pub mod ledger;
pub mod log;

pub use account::Account;
pub use ledger::{Ledger, LedgerOptions};
pub use log::EventLog;
