//! The append-only event log.
//!
//! The log is the sole source of truth: every observable ledger state is a
//! pure fold over its entries. Entries are never edited or reordered after
//! append; corrections are expressed as new compensating events.
//!
//! Actions pushed through [`EventLog::push`] must already be validated by
//! the ledger fold. The log itself only enforces structural rules:
//! contiguous sequence numbers and non-decreasing timestamps.

use grain_core::error::LedgerError;
use grain_core::event::{Action, LedgerEvent};

/// An ordered, append-only, immutable sequence of ledger events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    entries: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Immutable view of all entries, in append order.
    pub fn entries(&self) -> &[LedgerEvent] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Timestamp of the most recent entry, if any.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.entries.last().map(|e| e.timestamp_ms)
    }

    /// Check that `timestamp_ms` would not violate log monotonicity.
    ///
    /// # Errors
    ///
    /// [`LedgerError::TimeOrdering`] if `timestamp_ms` precedes the last
    /// entry's timestamp. Equal timestamps are allowed; the sequence
    /// number is the tie-break.
    pub fn validate_timestamp(&self, timestamp_ms: i64) -> Result<(), LedgerError> {
        match self.last_timestamp() {
            Some(last) if timestamp_ms < last => Err(LedgerError::TimeOrdering {
                last,
                got: timestamp_ms,
            }),
            _ => Ok(()),
        }
    }

    /// Append a pre-validated action, assigning the next sequence number.
    ///
    /// Callers must have run [`validate_timestamp`](Self::validate_timestamp)
    /// and the ledger fold's own validation first; this method cannot fail
    /// and never partially applies.
    pub(crate) fn push(&mut self, timestamp_ms: i64, action: Action) -> &LedgerEvent {
        let sequence = self.entries.len() as u64;
        self.entries.push(LedgerEvent {
            sequence,
            timestamp_ms,
            action,
        });
        &self.entries[sequence as usize]
    }

    /// Serialize the log as JSON lines, one entry per line.
    ///
    /// Field order is fixed by the struct definitions and allocation maps
    /// are ordered, so the output is byte-for-byte reproducible; replay
    /// across machines and versions relies on this.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Serialization`] if an entry fails to encode.
    pub fn to_json_lines(&self) -> Result<String, LedgerError> {
        let mut out = String::new();
        for entry in &self.entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse a log from JSON lines. Blank lines are ignored.
    ///
    /// Structural validation only (parse and sequence contiguity); the
    /// semantic fold happens in `Ledger::from_event_log`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MalformedLogEntry`] naming the offending line.
    pub fn from_json_lines(input: &str) -> Result<Self, LedgerError> {
        let mut entries = Vec::new();
        for (line_no, line) in input.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: LedgerEvent =
                serde_json::from_str(line).map_err(|e| LedgerError::MalformedLogEntry {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            if entry.sequence != entries.len() as u64 {
                return Err(LedgerError::MalformedLogEntry {
                    line: line_no,
                    reason: format!(
                        "sequence {} out of order, expected {}",
                        entry.sequence,
                        entries.len()
                    ),
                });
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }
}
