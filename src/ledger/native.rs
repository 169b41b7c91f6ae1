// Native Ledger - the capped-supply asset the exchange distributes
//
// Administrator-only minting under a hard cap, a pause gate over balance
// movements, and a one-way handoff of administration to the recorded
// distribution channel (the exchange).

use crate::access::{Administrator, PauseGate};
use crate::identity::Address;
use crate::ledger::book::{Book, LedgerCell, LedgerCore};
use crate::ledger::events::{EventLog, EventRecord, LedgerEvent};
use crate::ledger::traits::{Checkpoint, FungibleLedger, LedgerError, TokenConfig};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use tracing::{debug, info};

/// Administrative lifecycle of the native ledger. There is no edge back
/// from `HandedOff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// The deploying administrator is in control
    Issuing,
    /// Administration belongs to the distribution channel for good
    HandedOff,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct NativeControls {
    admin: Administrator,
    pause: PauseGate,
    channel: Option<Address>,
    lifecycle: Lifecycle,
}

/// Native ledger state for export/import
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NativeLedgerState {
    id: Address,
    config: TokenConfig,
    book: Book,
    controls: NativeControls,
    events: EventLog<LedgerEvent>,
}

impl NativeLedgerState {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        postcard::from_bytes(bytes).map_err(|e| LedgerError::StateError(e.to_string()))
    }
}

/// The capped, pausable native asset ledger
#[derive(Debug)]
pub struct NativeLedger {
    config: TokenConfig,
    supply_cap: u64,
    state: LedgerCell<NativeControls>,
}

impl NativeLedger {
    /// Create the ledger and mint `config.initial_supply` to `admin`
    pub fn new(id: Address, config: TokenConfig, admin: Address) -> Result<Self, LedgerError> {
        config.validate()?;
        if id.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let supply_cap = config
            .supply_cap
            .ok_or_else(|| LedgerError::InvalidConfig("native ledger requires a supply cap".to_string()))?;

        let controls = NativeControls {
            admin: Administrator::new(admin)?,
            pause: PauseGate::new(),
            channel: None,
            lifecycle: Lifecycle::Issuing,
        };

        let mut core = LedgerCore::new(id, controls);
        if config.initial_supply > 0 {
            core.issue(&admin, config.initial_supply)?;
        }

        info!(
            ledger = %config.symbol,
            cap = supply_cap,
            initial_supply = config.initial_supply,
            admin = %admin.short(),
            "native ledger created"
        );

        Ok(Self {
            config,
            supply_cap,
            state: LedgerCell::new(core),
        })
    }

    fn state(&self) -> MutexGuard<'_, LedgerCore<NativeControls>> {
        self.state.lock()
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn supply_cap(&self) -> u64 {
        self.supply_cap
    }

    /// Units that can still be minted before the cap is reached
    pub fn remaining_mintable(&self) -> u64 {
        self.supply_cap.saturating_sub(self.state().book().total_supply())
    }

    pub fn is_paused(&self) -> bool {
        self.state().controls().pause.is_paused()
    }

    pub fn administrator(&self) -> Address {
        self.state().controls().admin.current()
    }

    pub fn distribution_channel(&self) -> Option<Address> {
        self.state().controls().channel
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state().controls().lifecycle
    }

    /// Number of accounts holding a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.state().book().holder_count()
    }

    /// Sum of every balance; equals `total_supply` whenever no call is in flight
    pub fn sum_of_balances(&self) -> Option<u64> {
        self.state().book().sum_of_balances()
    }

    pub fn events(&self) -> Vec<EventRecord<LedgerEvent>> {
        self.state().events().to_vec()
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    /// Mint new units. Not blocked by the pause gate.
    pub fn mint(&self, caller: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.controls().admin.ensure(caller)?;

        let issued = state.book().total_supply();
        let within_cap = issued.checked_add(amount).is_some_and(|total| total <= self.supply_cap);
        if !within_cap {
            return Err(LedgerError::SupplyCapExceeded {
                cap: self.supply_cap,
                issued,
                requested: amount,
            });
        }

        state.issue(to, amount)?;
        info!(ledger = %self.config.symbol, to = %to.short(), amount, "minted");
        Ok(())
    }

    /// Open or close the transfer gate
    pub fn set_paused(&self, caller: &Address, paused: bool) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.controls().admin.ensure(caller)?;

        state.controls_mut().pause.set(paused);
        state.emit(LedgerEvent::PauseChanged { paused });
        info!(ledger = %self.config.symbol, paused, "pause flag updated");
        Ok(())
    }

    /// Record the component that will take over distribution. Informational
    /// until `handoff_to_distribution_channel` is called.
    pub fn set_distribution_channel(&self, caller: &Address, channel: &Address) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state.controls().lifecycle == Lifecycle::HandedOff {
            return Err(LedgerError::AdministrationLocked);
        }
        state.controls().admin.ensure(caller)?;
        if channel.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }

        let previous = state.controls_mut().channel.replace(*channel);
        state.emit(LedgerEvent::DistributionChannelUpdated {
            previous,
            channel: *channel,
        });
        info!(ledger = %self.config.symbol, channel = %channel.short(), "distribution channel recorded");
        Ok(())
    }

    /// Generic administrator transfer. Targeting the recorded channel is the
    /// handoff itself and locks administration.
    pub fn transfer_administration(&self, caller: &Address, new_admin: &Address) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state.controls().lifecycle == Lifecycle::HandedOff {
            return Err(LedgerError::AdministrationLocked);
        }
        if state.controls().channel == Some(*new_admin) {
            return self.hand_off(&mut state, caller);
        }

        let previous = state.controls_mut().admin.transfer(caller, *new_admin)?;
        state.emit(LedgerEvent::AdministrationTransferred {
            previous,
            administrator: *new_admin,
        });
        info!(
            ledger = %self.config.symbol,
            previous = %previous.short(),
            administrator = %new_admin.short(),
            "administration transferred"
        );
        Ok(())
    }

    /// Irreversibly make the distribution channel the administrator
    pub fn handoff_to_distribution_channel(&self, caller: &Address) -> Result<(), LedgerError> {
        let mut state = self.state();
        self.hand_off(&mut state, caller)
    }

    fn hand_off(&self, state: &mut LedgerCore<NativeControls>, caller: &Address) -> Result<(), LedgerError> {
        let channel = state.controls().channel.ok_or(LedgerError::ChannelNotSet)?;
        if state.controls().admin.is(&channel) {
            return Err(LedgerError::AlreadyCurrentAdmin);
        }

        let previous = state.controls_mut().admin.transfer(caller, channel)?;
        state.controls_mut().lifecycle = Lifecycle::HandedOff;
        state.emit(LedgerEvent::AdministrationTransferred {
            previous,
            administrator: channel,
        });
        info!(
            ledger = %self.config.symbol,
            previous = %previous.short(),
            channel = %channel.short(),
            "administration handed off to distribution channel"
        );
        Ok(())
    }

    // ========================================================================
    // STATE EXPORT/IMPORT
    // ========================================================================

    /// Export committed state for persistence
    pub fn export_state(&self) -> Result<NativeLedgerState, LedgerError> {
        let state = self.state();
        let (book, controls, events) = state.export()?;
        Ok(NativeLedgerState {
            id: state.id(),
            config: self.config.clone(),
            book,
            controls,
            events,
        })
    }

    /// Rebuild a ledger from exported state
    pub fn from_state(state: NativeLedgerState) -> Result<Self, LedgerError> {
        state.config.validate()?;
        let supply_cap = state
            .config
            .supply_cap
            .ok_or_else(|| LedgerError::InvalidConfig("native ledger requires a supply cap".to_string()))?;
        if state.book.total_supply() > supply_cap {
            return Err(LedgerError::StateError("issued supply exceeds cap".to_string()));
        }
        if state.book.sum_of_balances() != Some(state.book.total_supply()) {
            return Err(LedgerError::StateError("balances do not sum to issued supply".to_string()));
        }

        Ok(Self {
            config: state.config,
            supply_cap,
            state: LedgerCell::new(LedgerCore::from_parts(state.id, state.book, state.controls, state.events)),
        })
    }
}

impl FungibleLedger for NativeLedger {
    fn id(&self) -> Address {
        self.state().id()
    }

    fn symbol(&self) -> String {
        self.config.symbol.clone()
    }

    fn decimals(&self) -> u8 {
        self.config.decimals
    }

    fn total_supply(&self) -> u64 {
        self.state().book().total_supply()
    }

    fn balance_of(&self, account: &Address) -> u64 {
        self.state().book().balance_of(account)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.state().book().allowance(owner, spender)
    }

    fn transfer(&self, caller: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.controls().pause.ensure_open()?;
        state.move_funds(caller, to, amount)?;
        debug!(ledger = %self.config.symbol, from = %caller.short(), to = %to.short(), amount, "transfer");
        Ok(())
    }

    fn approve(&self, caller: &Address, spender: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.approve(caller, spender, amount)?;
        debug!(ledger = %self.config.symbol, owner = %caller.short(), spender = %spender.short(), amount, "approval");
        Ok(())
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.controls().pause.ensure_open()?;
        state.transfer_from(caller, from, to, amount)?;
        debug!(
            ledger = %self.config.symbol,
            spender = %caller.short(),
            from = %from.short(),
            to = %to.short(),
            amount,
            "transfer from allowance"
        );
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        self.state.checkpoint()
    }

    fn commit(&self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        self.state.commit(checkpoint)
    }

    fn revert(&self, checkpoint: Checkpoint) -> Result<(), LedgerError> {
        self.state.revert(checkpoint)
    }
}
