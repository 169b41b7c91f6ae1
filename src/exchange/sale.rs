// Exchange - sells native units for reference units at a fixed rate
//
// The exchange is custodian of whatever both ledgers credit to its address.
// Every state-changing entry point holds the reentrancy guard for its whole
// duration and never holds its own lock while calling a ledger. A purchase
// pulls payment first, then pushes the payout, inside checkpoints on both
// ledgers so a failure anywhere leaves no trace. The checkpoints keep other
// threads off both ledgers until the purchase is settled or rolled back.

use crate::access::{AccessError, Administrator, Entered, ReentrancyError, ReentrancyGuard};
use crate::exchange::events::{Asset, ExchangeEvent};
use crate::identity::Address;
use crate::ledger::{Checkpoint, EventLog, EventRecord, FungibleLedger, LedgerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// ERRORS
// ============================================================================

/// Errors that can occur during exchange operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Caller is not the administrator")]
    Unauthorized,

    #[error("Address must not be the zero address")]
    InvalidAddress,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Rate must be greater than zero")]
    InvalidRate,

    #[error("Exchange rate has not been set")]
    RateNotSet,

    #[error("Payment {paid} buys nothing at rate {rate}")]
    PurchaseBelowRate { paid: u64, rate: u64 },

    #[error("Insufficient inventory: available {available}, required {required}")]
    InsufficientInventory { available: u64, required: u64 },

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("Payment transfer failed: {0}")]
    PaymentTransferFailed(#[source] LedgerError),

    #[error("Payout transfer failed: {0}")]
    PayoutTransferFailed(#[source] LedgerError),

    #[error("Withdrawal transfer failed: {0}")]
    WithdrawalFailed(#[source] LedgerError),

    #[error("Ledger checkpoint could not be settled: {0}")]
    CheckpointFailed(#[source] LedgerError),

    #[error("Reentrant call rejected")]
    Reentrant,

    #[error("Decimals mismatch: native {native}, reference {reference}")]
    DecimalsMismatch { native: u8, reference: u8 },

    #[error("Native and reference ledgers must be distinct")]
    SameLedger,

    #[error("State export/import error: {0}")]
    StateError(String),
}

impl From<AccessError> for ExchangeError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized => ExchangeError::Unauthorized,
            AccessError::InvalidAddress => ExchangeError::InvalidAddress,
        }
    }
}

impl From<ReentrancyError> for ExchangeError {
    fn from(_: ReentrancyError) -> Self {
        ExchangeError::Reentrant
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExchangeControls {
    admin: Administrator,
    rate: u64,
    events: EventLog<ExchangeEvent>,
}

/// Exchange state for export/import
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeState {
    address: Address,
    native_ledger: Address,
    reference_ledger: Address,
    controls: ExchangeControls,
}

impl ExchangeState {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rate(&self) -> u64 {
        self.controls.rate
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExchangeError> {
        postcard::from_bytes(bytes).map_err(|e| ExchangeError::StateError(e.to_string()))
    }
}

// ============================================================================
// EXCHANGE
// ============================================================================

/// Fixed-rate exchange between a reference asset and a native asset
pub struct Exchange {
    address: Address,
    native: Arc<dyn FungibleLedger>,
    reference: Arc<dyn FungibleLedger>,
    controls: Mutex<ExchangeControls>,
    guard: ReentrancyGuard,
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("address", &self.address)
            .field("native", &self.native.id())
            .field("reference", &self.reference.id())
            .field("rate", &self.rate())
            .finish()
    }
}

impl Exchange {
    /// Create an exchange at `address` over two existing ledgers.
    /// The rate starts at zero; purchases fail until it is set.
    pub fn new(
        address: Address,
        admin: Address,
        native: Arc<dyn FungibleLedger>,
        reference: Arc<dyn FungibleLedger>,
    ) -> Result<Self, ExchangeError> {
        let controls = ExchangeControls {
            admin: Administrator::new(admin)?,
            rate: 0,
            events: EventLog::new(),
        };
        let exchange = Self::assemble(address, native, reference, controls)?;
        info!(
            exchange = %address.short(),
            native = %exchange.native.symbol(),
            reference = %exchange.reference.symbol(),
            admin = %admin.short(),
            "exchange created"
        );
        Ok(exchange)
    }

    fn assemble(
        address: Address,
        native: Arc<dyn FungibleLedger>,
        reference: Arc<dyn FungibleLedger>,
        controls: ExchangeControls,
    ) -> Result<Self, ExchangeError> {
        if address.is_zero() {
            return Err(ExchangeError::InvalidAddress);
        }
        if native.id() == reference.id() {
            return Err(ExchangeError::SameLedger);
        }
        if native.decimals() != reference.decimals() {
            return Err(ExchangeError::DecimalsMismatch {
                native: native.decimals(),
                reference: reference.decimals(),
            });
        }

        Ok(Self {
            address,
            native,
            reference,
            controls: Mutex::new(controls),
            guard: ReentrancyGuard::new(),
        })
    }

    fn controls(&self) -> MutexGuard<'_, ExchangeControls> {
        self.controls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) -> Result<Entered<'_>, ExchangeError> {
        self.guard.enter().map_err(|err| {
            debug!(exchange = %self.address.short(), "reentrant call rejected");
            ExchangeError::from(err)
        })
    }

    fn ledger(&self, asset: Asset) -> &Arc<dyn FungibleLedger> {
        match asset {
            Asset::Native => &self.native,
            Asset::Reference => &self.reference,
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// The exchange's own identity on both ledgers
    pub fn address(&self) -> Address {
        self.address
    }

    /// Reference units per native unit; zero until configured
    pub fn rate(&self) -> u64 {
        self.controls().rate
    }

    pub fn administrator(&self) -> Address {
        self.controls().admin.current()
    }

    pub fn native_ledger(&self) -> &Arc<dyn FungibleLedger> {
        &self.native
    }

    pub fn reference_ledger(&self) -> &Arc<dyn FungibleLedger> {
        &self.reference
    }

    /// Reference units collected and not yet withdrawn
    pub fn reference_asset_balance(&self) -> u64 {
        self.reference.balance_of(&self.address)
    }

    /// Native units still available for sale
    pub fn native_asset_balance(&self) -> u64 {
        self.native.balance_of(&self.address)
    }

    pub fn events(&self) -> Vec<EventRecord<ExchangeEvent>> {
        self.controls().events.records().to_vec()
    }

    /// Native units a payment of `amount_paid` would buy at the current rate.
    /// The remainder of the floor division stays with the exchange.
    pub fn quote(&self, amount_paid: u64) -> Result<u64, ExchangeError> {
        if amount_paid == 0 {
            return Err(ExchangeError::ZeroAmount);
        }
        let rate = self.rate();
        if rate == 0 {
            return Err(ExchangeError::RateNotSet);
        }

        let tokens = amount_paid / rate;
        if tokens == 0 {
            return Err(ExchangeError::PurchaseBelowRate { paid: amount_paid, rate });
        }
        Ok(tokens)
    }

    // ========================================================================
    // PURCHASE
    // ========================================================================

    /// Buy native units with `amount_paid` reference units taken from the
    /// buyer's allowance to the exchange. Returns the native units delivered.
    pub fn purchase(&self, buyer: &Address, amount_paid: u64) -> Result<u64, ExchangeError> {
        let _entered = self.enter()?;

        let tokens = self.quote(amount_paid)?;
        let inventory = self.native.balance_of(&self.address);
        if inventory < tokens {
            return Err(ExchangeError::InsufficientInventory {
                available: inventory,
                required: tokens,
            });
        }

        let payment = self.reference.checkpoint();
        let payout = self.native.checkpoint();
        let settled = self.settle(buyer, amount_paid, tokens);
        self.close(payment, payout, settled).inspect_err(|err| {
            warn!(
                exchange = %self.address.short(),
                buyer = %buyer.short(),
                amount_paid,
                error = %err,
                "purchase rolled back"
            );
        })?;

        self.controls().events.push(ExchangeEvent::Purchased {
            buyer: *buyer,
            amount_paid,
            tokens_received: tokens,
        });
        info!(
            exchange = %self.address.short(),
            buyer = %buyer.short(),
            amount_paid,
            tokens,
            "purchase settled"
        );
        Ok(tokens)
    }

    /// Payment pull, then payout push
    fn settle(&self, buyer: &Address, amount_paid: u64, tokens: u64) -> Result<(), ExchangeError> {
        self.reference
            .transfer_from(&self.address, buyer, &self.address, amount_paid)
            .map_err(ExchangeError::PaymentTransferFailed)?;
        self.native
            .transfer(&self.address, buyer, tokens)
            .map_err(ExchangeError::PayoutTransferFailed)?;
        Ok(())
    }

    /// Commit both checkpoints if settlement succeeded, otherwise revert both.
    /// Both are always closed, so neither ledger is left held by this thread.
    fn close(
        &self,
        payment: Checkpoint,
        payout: Checkpoint,
        settled: Result<(), ExchangeError>,
    ) -> Result<(), ExchangeError> {
        if let Err(err) = settled {
            let payout_reverted = self.native.revert(payout);
            let payment_reverted = self.reference.revert(payment);
            payout_reverted
                .and(payment_reverted)
                .map_err(ExchangeError::CheckpointFailed)?;
            return Err(err);
        }

        // An open checkpoint issued by the ledger itself always commits, so a
        // failure here means the frame was closed from outside this call
        if let Err(err) = self.native.commit(payout) {
            self.reference.revert(payment).map_err(ExchangeError::CheckpointFailed)?;
            return Err(ExchangeError::CheckpointFailed(err));
        }
        self.reference.commit(payment).map_err(ExchangeError::CheckpointFailed)
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    /// Set the number of reference units one native unit costs
    pub fn update_rate(&self, caller: &Address, new_rate: u64) -> Result<(), ExchangeError> {
        let _entered = self.enter()?;
        let mut controls = self.controls();
        controls.admin.ensure(caller)?;
        if new_rate == 0 {
            return Err(ExchangeError::InvalidRate);
        }

        let previous = std::mem::replace(&mut controls.rate, new_rate);
        controls.events.push(ExchangeEvent::RateUpdated {
            previous,
            rate: new_rate,
        });
        info!(exchange = %self.address.short(), previous, rate = new_rate, "rate updated");
        Ok(())
    }

    /// Send collected reference units to the administrator
    pub fn withdraw_reference_asset(&self, caller: &Address, amount: u64) -> Result<(), ExchangeError> {
        self.withdraw(caller, Asset::Reference, amount)
    }

    /// Send unsold native units to the administrator
    pub fn withdraw_native_asset(&self, caller: &Address, amount: u64) -> Result<(), ExchangeError> {
        self.withdraw(caller, Asset::Native, amount)
    }

    fn withdraw(&self, caller: &Address, asset: Asset, amount: u64) -> Result<(), ExchangeError> {
        let _entered = self.enter()?;

        let admin = {
            let controls = self.controls();
            controls.admin.ensure(caller)?;
            controls.admin.current()
        };
        if amount == 0 {
            return Err(ExchangeError::ZeroAmount);
        }

        let ledger = self.ledger(asset);
        let available = ledger.balance_of(&self.address);
        if available < amount {
            return Err(ExchangeError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        ledger
            .transfer(&self.address, &admin, amount)
            .map_err(ExchangeError::WithdrawalFailed)?;

        self.controls().events.push(ExchangeEvent::Withdrawn {
            asset,
            to: admin,
            amount,
        });
        info!(exchange = %self.address.short(), %asset, to = %admin.short(), amount, "withdrawal");
        Ok(())
    }

    pub fn transfer_administration(&self, caller: &Address, new_admin: &Address) -> Result<(), ExchangeError> {
        let _entered = self.enter()?;
        let mut controls = self.controls();
        let previous = controls.admin.transfer(caller, *new_admin)?;
        controls.events.push(ExchangeEvent::AdministrationTransferred {
            previous,
            administrator: *new_admin,
        });
        info!(
            exchange = %self.address.short(),
            previous = %previous.short(),
            administrator = %new_admin.short(),
            "administration transferred"
        );
        Ok(())
    }

    // ========================================================================
    // STATE EXPORT/IMPORT
    // ========================================================================

    /// Export exchange state for persistence
    pub fn export_state(&self) -> Result<ExchangeState, ExchangeError> {
        let _entered = self.enter()?;
        Ok(ExchangeState {
            address: self.address,
            native_ledger: self.native.id(),
            reference_ledger: self.reference.id(),
            controls: self.controls().clone(),
        })
    }

    /// Rebuild an exchange over the ledgers it was exported with
    pub fn restore(
        state: ExchangeState,
        native: Arc<dyn FungibleLedger>,
        reference: Arc<dyn FungibleLedger>,
    ) -> Result<Self, ExchangeError> {
        if native.id() != state.native_ledger || reference.id() != state.reference_ledger {
            return Err(ExchangeError::StateError(
                "ledgers do not match the exported exchange".to_string(),
            ));
        }
        Self::assemble(state.address, native, reference, state.controls)
    }
}
