// Reference Ledger - the payment asset buyers spend at the exchange
// Same balance/allowance contract as the native ledger, no cap, no pause.

use crate::access::Administrator;
use crate::identity::Address;
use crate::ledger::book::{Book, LedgerCell, LedgerCore};
use crate::ledger::events::{EventLog, EventRecord, LedgerEvent};
use crate::ledger::traits::{Checkpoint, FungibleLedger, LedgerError, TokenConfig};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use tracing::{debug, info};

/// Reference ledger state for export/import
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceLedgerState {
    id: Address,
    config: TokenConfig,
    book: Book,
    admin: Administrator,
    events: EventLog<LedgerEvent>,
}

impl ReferenceLedgerState {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        postcard::from_bytes(bytes).map_err(|e| LedgerError::StateError(e.to_string()))
    }
}

/// Uncapped payment-asset ledger; the administrator mints freely
#[derive(Debug)]
pub struct ReferenceLedger {
    config: TokenConfig,
    state: LedgerCell<Administrator>,
}

impl ReferenceLedger {
    pub fn new(id: Address, config: TokenConfig, admin: Address) -> Result<Self, LedgerError> {
        config.validate()?;
        if id.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        if config.supply_cap.is_some() {
            return Err(LedgerError::InvalidConfig(
                "reference ledger does not enforce a supply cap".to_string(),
            ));
        }

        let mut core = LedgerCore::new(id, Administrator::new(admin)?);
        if config.initial_supply > 0 {
            core.issue(&admin, config.initial_supply)?;
        }

        info!(ledger = %config.symbol, admin = %admin.short(), "reference ledger created");

        Ok(Self {
            config,
            state: LedgerCell::new(core),
        })
    }

    fn state(&self) -> MutexGuard<'_, LedgerCore<Administrator>> {
        self.state.lock()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn administrator(&self) -> Address {
        self.state().controls().current()
    }

    pub fn events(&self) -> Vec<EventRecord<LedgerEvent>> {
        self.state().events().to_vec()
    }

    /// Mint without bound (faucet)
    pub fn mint(&self, caller: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state();
        state.controls().ensure(caller)?;
        state.issue(to, amount)?;
        info!(ledger = %self.config.symbol, to = %to.short(), amount, "minted");
        Ok(())
    }

    pub fn transfer_administration(&self, caller: &Address, new_admin: &Address) -> Result<(), LedgerError> {
        let mut state = self.state();
        let previous = state.controls_mut().transfer(caller, *new_admin)?;
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

    /// Export committed state for persistence
    pub fn export_state(&self) -> Result<ReferenceLedgerState, LedgerError> {
        let state = self.state();
        let (book, admin, events) = state.export()?;
        Ok(ReferenceLedgerState {
            id: state.id(),
            config: self.config.clone(),
            book,
            admin,
            events,
        })
    }

    /// Rebuild a ledger from exported state
    pub fn from_state(state: ReferenceLedgerState) -> Result<Self, LedgerError> {
        state.config.validate()?;
        if state.book.sum_of_balances() != Some(state.book.total_supply()) {
            return Err(LedgerError::StateError("balances do not sum to issued supply".to_string()));
        }

        Ok(Self {
            config: state.config,
            state: LedgerCell::new(LedgerCore::from_parts(state.id, state.book, state.admin, state.events)),
        })
    }
}

impl FungibleLedger for ReferenceLedger {
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
        self.state().move_funds(caller, to, amount)?;
        debug!(ledger = %self.config.symbol, from = %caller.short(), to = %to.short(), amount, "transfer");
        Ok(())
    }

    fn approve(&self, caller: &Address, spender: &Address, amount: u64) -> Result<(), LedgerError> {
        self.state().approve(caller, spender, amount)?;
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
        self.state().transfer_from(caller, from, to, amount)?;
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
