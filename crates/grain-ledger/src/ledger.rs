//! The ledger state machine.
//!
//! A [`Ledger`] is a pure fold accumulator over its [`EventLog`]: the
//! account projection, name index and merge-redirect map are all derived
//! from the ordered event sequence and are rebuilt identically by replay.
//!
//! Every mutation validates, appends exactly one log entry (or a create
//! batch plus one, for a distribution that implicitly onboards unknown
//! recipients), and updates the projection. On any error nothing changes:
//! each apply step performs all fallible work before its first state write.
//!
//! Not thread-safe — mutations take `&mut self`, reads take `&self`.
//! A single owner (or an external lock) is the concurrency model; there is
//! no ambient global instance.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use grain_core::amount::GrainAmount;
use grain_core::distribution::Distribution;
use grain_core::error::LedgerError;
use grain_core::event::{Action, LedgerEvent};
use grain_core::identity::{Identity, IdentityId, IdentityName, IdentitySubtype};

use crate::account::Account;
use crate::log::EventLog;

/// Behavioural knobs for a ledger instance.
///
/// Options are host configuration, not log state: they are not serialized
/// into the event log and must be supplied again on replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOptions {
    /// When set, `distribute_grain` creates identities for allocation
    /// recipients it has never seen, instead of rejecting the
    /// distribution. Used when the external scoring pipeline discovers
    /// contributors before they are onboarded explicitly.
    pub auto_create_recipients: bool,
}

/// The event-sourced ledger: identities, balances, distribution history.
#[derive(Clone, Debug)]
pub struct Ledger {
    log: EventLog,
    /// Canonical (non-merged) accounts by identity id.
    accounts: HashMap<IdentityId, Account>,
    /// Every name ever used (current names and aliases) → canonical owner.
    /// Names are reserved forever; releases would let an old log entry's
    /// name refer to a different identity after replay.
    names: HashMap<String, IdentityId>,
    /// Merged-away id → the id it was merged into. Followed transitively
    /// by [`canonical`](Self::canonical).
    redirects: HashMap<IdentityId, IdentityId>,
    last_distribution_ms: Option<i64>,
    options: LedgerOptions,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new(options: LedgerOptions) -> Self {
        Self {
            log: EventLog::new(),
            accounts: HashMap::new(),
            names: HashMap::new(),
            redirects: HashMap::new(),
            last_distribution_ms: None,
            options,
        }
    }

    /// Rebuild a ledger by replaying a full event log from empty state.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ReplayFailed`] naming the sequence number of the
    /// first entry that violates an invariant. A log that fails replay
    /// cannot be partially trusted; no ledger is returned.
    pub fn from_event_log(
        entries: Vec<LedgerEvent>,
        options: LedgerOptions,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(options);
        for (index, event) in entries.into_iter().enumerate() {
            ledger
                .replay_step(index, &event)
                .map_err(|source| LedgerError::ReplayFailed {
                    sequence: index as u64,
                    source: Box::new(source),
                })?;
            ledger.log.push(event.timestamp_ms, event.action);
        }
        debug!(events = ledger.log.len(), "ledger replayed");
        Ok(ledger)
    }

    /// One replay step: structural checks plus the fold transition, without
    /// appending (the caller pushes on success).
    fn replay_step(&mut self, index: usize, event: &LedgerEvent) -> Result<(), LedgerError> {
        if event.sequence != index as u64 {
            return Err(LedgerError::MalformedLogEntry {
                line: index,
                reason: format!("sequence {} out of order, expected {index}", event.sequence),
            });
        }
        self.log.validate_timestamp(event.timestamp_ms)?;
        self.apply(&event.action)
    }

    /// Parse a JSON-lines log and replay it.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MalformedLogEntry`] for parse failures,
    /// [`LedgerError::ReplayFailed`] for fold failures.
    pub fn from_json_lines(input: &str, options: LedgerOptions) -> Result<Self, LedgerError> {
        let log = EventLog::from_json_lines(input)?;
        Self::from_event_log(log.entries().to_vec(), options)
    }

    // ---- read projections ----

    /// The full event log, for persistence by the external storage
    /// collaborator.
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Snapshot of all canonical accounts, in no particular order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Look up one account.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownIdentity`] if the id was never created or has
    /// been merged away.
    pub fn account(&self, id: IdentityId) -> Result<&Account, LedgerError> {
        self.accounts
            .get(&id)
            .ok_or(LedgerError::UnknownIdentity(id))
    }

    /// Resolve an id through the merge-redirect chain to its canonical
    /// identity. `None` if the id was never created.
    pub fn canonical(&self, id: IdentityId) -> Option<IdentityId> {
        let mut current = id;
        loop {
            if self.accounts.contains_key(&current) {
                return Some(current);
            }
            match self.redirects.get(&current) {
                Some(next) => current = *next,
                None => return None,
            }
        }
    }

    /// Timestamp of the most recent distribution, or `None` if none ever
    /// occurred.
    pub fn last_distribution_timestamp(&self) -> Option<i64> {
        self.last_distribution_ms
    }

    /// The options this ledger was constructed with.
    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    // ---- mutations ----

    /// Create a new identity with a fresh random id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NameTaken`] if the name is already in use (current
    /// names and aliases both count).
    pub fn create_identity(
        &mut self,
        name: IdentityName,
        subtype: IdentitySubtype,
    ) -> Result<IdentityId, LedgerError> {
        let ts = self.next_timestamp();
        self.create_identity_at(name, subtype, ts)
    }

    /// [`create_identity`](Self::create_identity) with an explicit
    /// timestamp; fails with [`LedgerError::TimeOrdering`] if it precedes
    /// the last log entry.
    pub fn create_identity_at(
        &mut self,
        name: IdentityName,
        subtype: IdentitySubtype,
        timestamp_ms: i64,
    ) -> Result<IdentityId, LedgerError> {
        let identity = Identity::new(name, subtype);
        let id = identity.id;
        self.append_and_apply(timestamp_ms, Action::CreateIdentity { identity })?;
        info!(%id, "identity created");
        Ok(id)
    }

    /// Change an identity's display name, retaining the old name as an
    /// alias.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownIdentity`], [`LedgerError::NameTaken`],
    /// [`LedgerError::TimeOrdering`] (explicit-timestamp variant).
    pub fn rename_identity(
        &mut self,
        id: IdentityId,
        new_name: IdentityName,
    ) -> Result<(), LedgerError> {
        let ts = self.next_timestamp();
        self.rename_identity_at(id, new_name, ts)
    }

    /// [`rename_identity`](Self::rename_identity) with an explicit timestamp.
    pub fn rename_identity_at(
        &mut self,
        id: IdentityId,
        new_name: IdentityName,
        timestamp_ms: i64,
    ) -> Result<(), LedgerError> {
        self.append_and_apply(timestamp_ms, Action::RenameIdentity { id, new_name })?;
        debug!(%id, "identity renamed");
        Ok(())
    }

    /// Merge `from` into `into`: balances and lifetime earnings move to
    /// `into`, `from`'s names become aliases of `into`, and `from` is
    /// permanently retired. Irreversible within the log; a corrective
    /// merge can only be layered on top.
    ///
    /// # Errors
    ///
    /// [`LedgerError::SelfMerge`], [`LedgerError::AlreadyMerged`],
    /// [`LedgerError::UnknownIdentity`].
    pub fn merge_identities(
        &mut self,
        into: IdentityId,
        from: IdentityId,
    ) -> Result<(), LedgerError> {
        let ts = self.next_timestamp();
        self.merge_identities_at(into, from, ts)
    }

    /// [`merge_identities`](Self::merge_identities) with an explicit timestamp.
    pub fn merge_identities_at(
        &mut self,
        into: IdentityId,
        from: IdentityId,
        timestamp_ms: i64,
    ) -> Result<(), LedgerError> {
        self.append_and_apply(timestamp_ms, Action::MergeIdentities { into, from })?;
        info!(%into, %from, "identities merged");
        Ok(())
    }

    /// Set whether an identity may receive new allocations. Deactivated
    /// identities keep their balance and history.
    pub fn set_active(&mut self, id: IdentityId, active: bool) -> Result<(), LedgerError> {
        let ts = self.next_timestamp();
        self.set_active_at(id, active, ts)
    }

    /// [`set_active`](Self::set_active) with an explicit timestamp.
    pub fn set_active_at(
        &mut self,
        id: IdentityId,
        active: bool,
        timestamp_ms: i64,
    ) -> Result<(), LedgerError> {
        self.append_and_apply(timestamp_ms, Action::ToggleActivation { id, active })?;
        debug!(%id, active, "activation toggled");
        Ok(())
    }

    /// Record a computed distribution as one atomic event.
    ///
    /// If [`LedgerOptions::auto_create_recipients`] is set, recipients the
    /// ledger has never seen are onboarded first with generated
    /// `contributor-<hex>` names; those create events share the
    /// distribution event's timestamp. Merged-away recipients are always
    /// rejected — retired ids cannot come back.
    ///
    /// # Errors
    ///
    /// [`LedgerError::BudgetMismatch`] if allocations do not sum to the
    /// declared budget, [`LedgerError::UnknownIdentity`] for unknown or
    /// merged-away recipients (subject to the auto-create option). On any
    /// error the log and projection are unchanged.
    pub fn distribute_grain(&mut self, distribution: Distribution) -> Result<(), LedgerError> {
        let ts = self.next_timestamp();
        self.distribute_grain_at(distribution, ts)
    }

    /// [`distribute_grain`](Self::distribute_grain) with an explicit timestamp.
    pub fn distribute_grain_at(
        &mut self,
        distribution: Distribution,
        timestamp_ms: i64,
    ) -> Result<(), LedgerError> {
        // Validate the whole compound operation before appending anything,
        // so a failure cannot leave stray create events behind.
        distribution.verify_total()?;
        self.log.validate_timestamp(timestamp_ms)?;

        let mut to_create: Vec<Identity> = Vec::new();
        let mut pending_names: Vec<String> = Vec::new();
        for (&id, &amount) in &distribution.allocations {
            match self.accounts.get(&id) {
                Some(account) => {
                    account.balance.checked_add(amount)?;
                    account.paid.checked_add(amount)?;
                }
                None => {
                    if self.redirects.contains_key(&id) || !self.options.auto_create_recipients {
                        return Err(LedgerError::UnknownIdentity(id));
                    }
                    let name = IdentityName::new(format!("contributor-{}", &id.to_string()[..8]))?;
                    if self.names.contains_key(name.as_str())
                        || pending_names.iter().any(|n| n == name.as_str())
                    {
                        return Err(LedgerError::NameTaken(name.as_str().to_string()));
                    }
                    pending_names.push(name.as_str().to_string());
                    to_create.push(Identity {
                        id,
                        name,
                        subtype: IdentitySubtype::Bot,
                        aliases: Vec::new(),
                    });
                }
            }
        }

        let created = to_create.len();
        for identity in to_create {
            self.append_and_apply(timestamp_ms, Action::CreateIdentity { identity })?;
        }

        let id = distribution.id;
        let recipients = distribution.allocations.len();
        self.append_and_apply(timestamp_ms, Action::DistributeGrain { distribution })?;
        info!(
            distribution = %id,
            recipients,
            auto_created = created,
            "grain distributed"
        );
        Ok(())
    }

    /// Move grain from one identity's balance to another's. Lifetime
    /// earnings are unaffected.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownIdentity`] for either party;
    /// [`AmountError::InsufficientBalance`](grain_core::error::AmountError::InsufficientBalance)
    /// if the sender's balance is short.
    pub fn transfer_grain(
        &mut self,
        from: IdentityId,
        to: IdentityId,
        amount: GrainAmount,
        memo: Option<String>,
    ) -> Result<(), LedgerError> {
        let ts = self.next_timestamp();
        self.transfer_grain_at(from, to, amount, memo, ts)
    }

    /// [`transfer_grain`](Self::transfer_grain) with an explicit timestamp.
    pub fn transfer_grain_at(
        &mut self,
        from: IdentityId,
        to: IdentityId,
        amount: GrainAmount,
        memo: Option<String>,
        timestamp_ms: i64,
    ) -> Result<(), LedgerError> {
        self.append_and_apply(
            timestamp_ms,
            Action::TransferGrain {
                from,
                to,
                amount,
                memo,
            },
        )?;
        debug!(%from, %to, %amount, "grain transferred");
        Ok(())
    }

    // ---- fold internals ----

    /// Default timestamp for a mutation: wall clock, clamped up to the
    /// last entry's timestamp so appends never regress even under clock
    /// skew.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        match self.log.last_timestamp() {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    /// Validate order, apply the action, then append. `apply` performs all
    /// fallible work before its first state write, so a failure anywhere
    /// leaves both projection and log untouched.
    fn append_and_apply(
        &mut self,
        timestamp_ms: i64,
        action: Action,
    ) -> Result<&LedgerEvent, LedgerError> {
        self.log.validate_timestamp(timestamp_ms)?;
        self.apply(&action)?;
        Ok(self.log.push(timestamp_ms, action))
    }

    /// The transition function: one fold step. Total over well-formed
    /// actions; any invariant violation is a typed error with no partial
    /// mutation.
    fn apply(&mut self, action: &Action) -> Result<(), LedgerError> {
        match action {
            Action::CreateIdentity { identity } => self.apply_create(identity),
            Action::RenameIdentity { id, new_name } => self.apply_rename(*id, new_name),
            Action::MergeIdentities { into, from } => self.apply_merge(*into, *from),
            Action::ToggleActivation { id, active } => self.apply_toggle(*id, *active),
            Action::DistributeGrain { distribution } => self.apply_distribute(distribution),
            Action::TransferGrain {
                from, to, amount, ..
            } => self.apply_transfer(*from, *to, *amount),
        }
    }

    fn apply_create(&mut self, identity: &Identity) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&identity.id) || self.redirects.contains_key(&identity.id) {
            return Err(LedgerError::IdReused(identity.id));
        }
        for name in std::iter::once(&identity.name).chain(&identity.aliases) {
            if self.names.contains_key(name.as_str()) {
                return Err(LedgerError::NameTaken(name.as_str().to_string()));
            }
        }

        for name in std::iter::once(&identity.name).chain(&identity.aliases) {
            self.names.insert(name.as_str().to_string(), identity.id);
        }
        self.accounts
            .insert(identity.id, Account::new(identity.clone()));
        Ok(())
    }

    fn apply_rename(&mut self, id: IdentityId, new_name: &IdentityName) -> Result<(), LedgerError> {
        if !self.accounts.contains_key(&id) {
            return Err(LedgerError::UnknownIdentity(id));
        }
        if self.names.contains_key(new_name.as_str()) {
            return Err(LedgerError::NameTaken(new_name.as_str().to_string()));
        }

        self.names.insert(new_name.as_str().to_string(), id);
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::UnknownIdentity(id))?;
        let old_name = std::mem::replace(&mut account.identity.name, new_name.clone());
        account.identity.aliases.push(old_name);
        Ok(())
    }

    fn apply_merge(&mut self, into: IdentityId, from: IdentityId) -> Result<(), LedgerError> {
        if into == from {
            return Err(LedgerError::SelfMerge(into));
        }
        if self.redirects.contains_key(&from) {
            return Err(LedgerError::AlreadyMerged(from));
        }
        if self.redirects.contains_key(&into) {
            return Err(LedgerError::AlreadyMerged(into));
        }
        let from_account = self
            .accounts
            .get(&from)
            .ok_or(LedgerError::UnknownIdentity(from))?
            .clone();
        let into_account = self
            .accounts
            .get(&into)
            .ok_or(LedgerError::UnknownIdentity(into))?;
        let merged_balance = into_account.balance.checked_add(from_account.balance)?;
        let merged_paid = into_account.paid.checked_add(from_account.paid)?;

        self.accounts.remove(&from);
        self.redirects.insert(from, into);
        for name in std::iter::once(&from_account.identity.name)
            .chain(&from_account.identity.aliases)
        {
            self.names.insert(name.as_str().to_string(), into);
        }
        // Checked above; the entry cannot have vanished between the read
        // and this write, but stay in Result form rather than indexing.
        let into_account = self
            .accounts
            .get_mut(&into)
            .ok_or(LedgerError::UnknownIdentity(into))?;
        into_account.balance = merged_balance;
        into_account.paid = merged_paid;
        into_account
            .identity
            .aliases
            .push(from_account.identity.name);
        into_account
            .identity
            .aliases
            .extend(from_account.identity.aliases);
        Ok(())
    }

    fn apply_toggle(&mut self, id: IdentityId, active: bool) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::UnknownIdentity(id))?;
        account.active = active;
        Ok(())
    }

    fn apply_distribute(&mut self, distribution: &Distribution) -> Result<(), LedgerError> {
        distribution.verify_total()?;

        let mut credits = Vec::with_capacity(distribution.allocations.len());
        for (&id, &amount) in &distribution.allocations {
            let account = self
                .accounts
                .get(&id)
                .ok_or(LedgerError::UnknownIdentity(id))?;
            let balance = account.balance.checked_add(amount)?;
            let paid = account.paid.checked_add(amount)?;
            credits.push((id, balance, paid));
        }

        for (id, balance, paid) in credits {
            // Present: looked up above, and nothing mutates between.
            if let Some(account) = self.accounts.get_mut(&id) {
                account.balance = balance;
                account.paid = paid;
            }
        }
        self.last_distribution_ms = Some(match self.last_distribution_ms {
            Some(last) => last.max(distribution.timestamp_ms),
            None => distribution.timestamp_ms,
        });
        Ok(())
    }

    fn apply_transfer(
        &mut self,
        from: IdentityId,
        to: IdentityId,
        amount: GrainAmount,
    ) -> Result<(), LedgerError> {
        let sender = self
            .accounts
            .get(&from)
            .ok_or(LedgerError::UnknownIdentity(from))?;
        let receiver = self
            .accounts
            .get(&to)
            .ok_or(LedgerError::UnknownIdentity(to))?;
        let debited = sender.balance.checked_sub(amount)?;
        if from == to {
            // Self-transfer: validated above, moves nothing.
            return Ok(());
        }
        let credited = receiver.balance.checked_add(amount)?;

        if let Some(account) = self.accounts.get_mut(&from) {
            account.balance = debited;
        }
        if let Some(account) = self.accounts.get_mut(&to) {
            account.balance = credited;
        }
        Ok(())
    }
}
