// Balance book shared by both ledgers
//
// Holds balances, allowances and issued supply, plus an undo journal that is
// only recorded while a checkpoint is open. Reverting replays the journal
// backwards, cuts the event log and restores the ledger's control fields
// (administrator, pause flag, ...) captured when the checkpoint was taken.
//
// An open checkpoint makes the ledger private to the thread that opened it,
// so the journal only ever holds that thread's writes.

use crate::identity::Address;
use crate::ledger::events::{EventLog, EventRecord, LedgerEvent};
use crate::ledger::traits::{Checkpoint, LedgerError, UNLIMITED_ALLOWANCE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Balances, allowances and issued supply of one asset
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    balances: HashMap<Address, u64>,
    allowances: HashMap<(Address, Address), u64>,
    total_supply: u64,
}

impl Book {
    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Sum of all balances, `None` on overflow
    pub fn sum_of_balances(&self) -> Option<u64> {
        self.balances.values().try_fold(0u64, |acc, b| acc.checked_add(*b))
    }

    /// All non-zero balances
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.balances.iter()
    }

    fn write_balance(&mut self, account: Address, value: u64) {
        if value == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, value);
        }
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, value: u64) {
        if value == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
    }
}

/// Inverse of one book mutation
#[derive(Clone, Debug)]
enum Undo {
    Balance { account: Address, previous: u64 },
    Allowance { owner: Address, spender: Address, previous: u64 },
    Supply { previous: u64 },
}

#[derive(Clone, Debug)]
struct Frame<C> {
    serial: u64,
    journal_len: usize,
    events_len: usize,
    controls: C,
}

/// Book + event log + ledger-specific controls, with nested checkpoints
#[derive(Debug)]
pub(crate) struct LedgerCore<C> {
    id: Address,
    book: Book,
    controls: C,
    events: EventLog<LedgerEvent>,
    journal: Vec<Undo>,
    frames: Vec<Frame<C>>,
    owner: Option<ThreadId>,
    next_serial: u64,
}

impl<C: Clone> LedgerCore<C> {
    pub(crate) fn new(id: Address, controls: C) -> Self {
        Self::from_parts(id, Book::default(), controls, EventLog::new())
    }

    pub(crate) fn from_parts(id: Address, book: Book, controls: C, events: EventLog<LedgerEvent>) -> Self {
        Self {
            id,
            book,
            controls,
            events,
            journal: Vec::new(),
            frames: Vec::new(),
            owner: None,
            next_serial: 0,
        }
    }

    pub(crate) fn id(&self) -> Address {
        self.id
    }

    pub(crate) fn book(&self) -> &Book {
        &self.book
    }

    pub(crate) fn controls(&self) -> &C {
        &self.controls
    }

    pub(crate) fn controls_mut(&mut self) -> &mut C {
        &mut self.controls
    }

    pub(crate) fn events(&self) -> &[EventRecord<LedgerEvent>] {
        self.events.records()
    }

    pub(crate) fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    // ========================================================================
    // JOURNALED WRITES
    // ========================================================================

    fn set_balance(&mut self, account: Address, value: u64) {
        if !self.frames.is_empty() {
            let previous = self.book.balance_of(&account);
            self.journal.push(Undo::Balance { account, previous });
        }
        self.book.write_balance(account, value);
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, value: u64) {
        if !self.frames.is_empty() {
            let previous = self.book.allowance(&owner, &spender);
            self.journal.push(Undo::Allowance { owner, spender, previous });
        }
        self.book.write_allowance(owner, spender, value);
    }

    fn set_supply(&mut self, value: u64) {
        if !self.frames.is_empty() {
            self.journal.push(Undo::Supply {
                previous: self.book.total_supply,
            });
        }
        self.book.total_supply = value;
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Create `amount` new units for `to`. Cap checks belong to the caller.
    pub(crate) fn issue(&mut self, to: &Address, amount: u64) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }

        let supply = self.book.total_supply.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let balance = self.book.balance_of(to).checked_add(amount).ok_or(LedgerError::Overflow)?;

        self.set_supply(supply);
        self.set_balance(*to, balance);
        self.emit(LedgerEvent::Issued { to: *to, amount });
        Ok(())
    }

    /// Move `amount` between two accounts
    pub(crate) fn move_funds(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let (from_after, to_after) = self.check_move(from, to, amount)?;
        self.apply_move(from, to, amount, from_after, to_after);
        Ok(())
    }

    /// Overwrite an allowance
    pub(crate) fn approve(&mut self, owner: &Address, spender: &Address, amount: u64) -> Result<(), LedgerError> {
        if spender.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }

        self.set_allowance(*owner, *spender, amount);
        self.emit(LedgerEvent::Approval {
            owner: *owner,
            spender: *spender,
            amount,
        });
        Ok(())
    }

    /// Spend `spender`'s allowance over `from` and move the funds
    pub(crate) fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let allowance = self.book.allowance(from, spender);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                available: allowance,
                required: amount,
            });
        }
        let (from_after, to_after) = self.check_move(from, to, amount)?;

        if allowance != UNLIMITED_ALLOWANCE {
            self.set_allowance(*from, *spender, allowance - amount);
        }
        self.apply_move(from, to, amount, from_after, to_after);
        Ok(())
    }

    /// Validate a move and compute the resulting balances. Balance is checked
    /// before the recipient.
    fn check_move(&self, from: &Address, to: &Address, amount: u64) -> Result<(u64, u64), LedgerError> {
        let available = self.book.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }

        if from == to {
            return Ok((available, available));
        }

        let to_after = self.book.balance_of(to).checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok((available - amount, to_after))
    }

    fn apply_move(&mut self, from: &Address, to: &Address, amount: u64, from_after: u64, to_after: u64) {
        if from != to {
            self.set_balance(*from, from_after);
            self.set_balance(*to, to_after);
        }
        self.emit(LedgerEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        });
    }

    // ========================================================================
    // CHECKPOINTS
    // ========================================================================

    pub(crate) fn has_open_checkpoint(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Whether the calling thread must wait for another thread's checkpoint
    fn held_elsewhere(&self) -> bool {
        self.owner.is_some_and(|owner| owner != thread::current().id())
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.owner = Some(thread::current().id());
        self.frames.push(Frame {
            serial,
            journal_len: self.journal.len(),
            events_len: self.events.len(),
            controls: self.controls.clone(),
        });
        Checkpoint::new(self.id, self.frames.len() - 1, serial)
    }

    /// Position of the frame `checkpoint` refers to, if it is still open
    fn frame_index(&self, checkpoint: &Checkpoint) -> Result<usize, LedgerError> {
        if checkpoint.ledger() != self.id {
            return Err(LedgerError::UnknownCheckpoint);
        }
        match self.frames.get(checkpoint.depth()) {
            Some(frame) if frame.serial == checkpoint.serial() => Ok(checkpoint.depth()),
            _ => Err(LedgerError::UnknownCheckpoint),
        }
    }

    fn release_if_closed(&mut self) {
        if self.frames.is_empty() {
            self.journal.clear();
            self.owner = None;
        }
    }

    /// Close `checkpoint` and every frame nested in it, keeping their writes
    pub(crate) fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        let index = self.frame_index(&checkpoint)?;
        self.frames.truncate(index);
        self.release_if_closed();
        Ok(())
    }

    /// Close `checkpoint` and every frame nested in it, undoing their writes
    pub(crate) fn revert(&mut self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        let index = self.frame_index(&checkpoint)?;
        let frame = self.frames.drain(index..).next().ok_or(LedgerError::UnknownCheckpoint)?;

        while self.journal.len() > frame.journal_len {
            match self.journal.pop() {
                Some(Undo::Balance { account, previous }) => self.book.write_balance(account, previous),
                Some(Undo::Allowance { owner, spender, previous }) => {
                    self.book.write_allowance(owner, spender, previous)
                }
                Some(Undo::Supply { previous }) => self.book.total_supply = previous,
                None => break,
            }
        }

        self.events.truncate(frame.events_len);
        self.controls = frame.controls;
        self.release_if_closed();
        Ok(())
    }

    /// Committed state for export; refused while a checkpoint is open
    pub(crate) fn export(&self) -> Result<(Book, C, EventLog<LedgerEvent>), LedgerError> {
        if self.has_open_checkpoint() {
            return Err(LedgerError::CheckpointOpen);
        }
        Ok((self.book.clone(), self.controls.clone(), self.events.clone()))
    }
}

// ============================================================================
// LOCKING
// ============================================================================

/// Mutex around a `LedgerCore` that parks every thread but the checkpoint
/// owner until the outermost checkpoint is closed
#[derive(Debug)]
pub(crate) struct LedgerCell<C> {
    core: Mutex<LedgerCore<C>>,
    released: Condvar,
}

impl<C: Clone> LedgerCell<C> {
    pub(crate) fn new(core: LedgerCore<C>) -> Self {
        Self {
            core: Mutex::new(core),
            released: Condvar::new(),
        }
    }

    /// Lock the core, waiting out checkpoints held by other threads
    pub(crate) fn lock(&self) -> MutexGuard<'_, LedgerCore<C>> {
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        while core.held_elsewhere() {
            core = self.released.wait(core).unwrap_or_else(PoisonError::into_inner);
        }
        core
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        self.lock().checkpoint()
    }

    pub(crate) fn commit(&self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        let mut core = self.lock();
        let result = core.commit(checkpoint);
        self.notify_if_released(&core);
        result
    }

    pub(crate) fn revert(&self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        let mut core = self.lock();
        let result = core.revert(checkpoint);
        self.notify_if_released(&core);
        result
    }

    fn notify_if_released(&self, core: &LedgerCore<C>) {
        if !core.has_open_checkpoint() {
            self.released.notify_all();
        }
    }
}
