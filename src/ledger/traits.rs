// Ledger traits and core types
// The capability interface every asset ledger exposes to the exchange

use crate::access::{AccessError, PausedError};
use crate::identity::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fractional digits shared by both assets. The exchange divides one
/// asset's quantity by the rate to get the other's, so both must match.
pub const DECIMALS: u8 = 6;

/// Allowance value that is never decremented by spends
pub const UNLIMITED_ALLOWANCE: u64 = u64::MAX;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors that can occur during ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Caller is not the administrator")]
    Unauthorized,

    #[error("Transfers are paused")]
    Paused,

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("Insufficient allowance: available {available}, required {required}")]
    InsufficientAllowance { available: u64, required: u64 },

    #[error("Recipient must not be the zero address")]
    InvalidRecipient,

    #[error("Address must not be the zero address")]
    InvalidAddress,

    #[error("Supply cap exceeded: cap {cap}, issued {issued}, requested {requested}")]
    SupplyCapExceeded { cap: u64, issued: u64, requested: u64 },

    #[error("No distribution channel has been recorded")]
    ChannelNotSet,

    #[error("Distribution channel is already the administrator")]
    AlreadyCurrentAdmin,

    #[error("Administration has been handed off and can no longer change")]
    AdministrationLocked,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Checkpoint is not open on this ledger")]
    UnknownCheckpoint,

    #[error("Cannot export state while a checkpoint is open")]
    CheckpointOpen,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State export/import error: {0}")]
    StateError(String),
}

impl From<AccessError> for LedgerError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized => LedgerError::Unauthorized,
            AccessError::InvalidAddress => LedgerError::InvalidAddress,
        }
    }
}

impl From<PausedError> for LedgerError {
    fn from(_: PausedError) -> Self {
        LedgerError::Paused
    }
}

// ============================================================================
// CHECKPOINT
// ============================================================================

/// Handle to an open all-or-nothing scope on one ledger.
///
/// Obtained from [`FungibleLedger::checkpoint`] and consumed by exactly one of
/// [`FungibleLedger::commit`] or [`FungibleLedger::revert`]. While any
/// checkpoint is open the ledger belongs to the thread that opened it; other
/// threads block until the outermost checkpoint is closed.
#[must_use = "an open checkpoint must be committed or reverted"]
#[derive(Debug, PartialEq, Eq)]
pub struct Checkpoint {
    ledger: Address,
    depth: usize,
    serial: u64,
}

impl Checkpoint {
    pub(crate) fn new(ledger: Address, depth: usize, serial: u64) -> Self {
        Self { ledger, depth, serial }
    }

    /// Ledger that issued this checkpoint
    pub fn ledger(&self) -> Address {
        self.ledger
    }

    /// Nesting depth (0 = outermost)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }
}

// ============================================================================
// FUNGIBLE LEDGER TRAIT
// ============================================================================

/// Balance/allowance contract shared by the native and reference ledgers.
///
/// Every call names its caller explicitly. Implementations are internally
/// synchronized and must not hold a lock while calling out, so a collaborator
/// may call back into whoever invoked it.
pub trait FungibleLedger: Send + Sync {
    /// Identity of the ledger itself
    fn id(&self) -> Address;

    fn symbol(&self) -> String;

    fn decimals(&self) -> u8;

    fn total_supply(&self) -> u64;

    fn balance_of(&self, account: &Address) -> u64;

    fn allowance(&self, owner: &Address, spender: &Address) -> u64;

    /// Move `amount` from `caller` to `to`
    fn transfer(&self, caller: &Address, to: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Set `allowance[caller][spender] = amount` (overwrite, not additive)
    fn approve(&self, caller: &Address, spender: &Address, amount: u64) -> Result<(), LedgerError>;

    /// Spend `caller`'s allowance over `from` to move `amount` to `to`
    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Open a nested all-or-nothing scope, waiting while another thread
    /// holds one on this ledger
    fn checkpoint(&self) -> Checkpoint;

    /// Keep everything done since `checkpoint`. Checkpoints still open inside
    /// it are folded in.
    fn commit(&self, checkpoint: Checkpoint) -> Result<(), LedgerError>;

    /// Undo everything done since `checkpoint`, events included. Checkpoints
    /// still open inside it are discarded with it.
    fn revert(&self, checkpoint: Checkpoint) -> Result<(), LedgerError>;
}

// ============================================================================
// TOKEN CONFIG
// ============================================================================

/// Configuration for a ledger instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Fractional digits
    pub decimals: u8,
    /// Hard cap on issued quantity (native ledger only)
    pub supply_cap: Option<u64>,
    /// Quantity minted to the administrator at creation
    pub initial_supply: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::native("Sale Token", "SALE", 1_000_000_000 * 10u64.pow(DECIMALS as u32))
    }
}

impl TokenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for a capped native asset
    pub fn native(name: &str, symbol: &str, supply_cap: u64) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: DECIMALS,
            supply_cap: Some(supply_cap),
            initial_supply: 0,
        }
    }

    /// Config for an uncapped reference (payment) asset
    pub fn reference(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: DECIMALS,
            supply_cap: None,
            initial_supply: 0,
        }
    }

    pub fn with_supply_cap(mut self, cap: u64) -> Self {
        self.supply_cap = Some(cap);
        self
    }

    pub fn with_initial_supply(mut self, amount: u64) -> Self {
        self.initial_supply = amount;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.symbol.is_empty() {
            return Err(LedgerError::InvalidConfig("symbol cannot be empty".to_string()));
        }
        if let Some(cap) = self.supply_cap {
            if self.initial_supply > cap {
                return Err(LedgerError::InvalidConfig(format!(
                    "initial supply {} exceeds cap {}",
                    self.initial_supply, cap
                )));
            }
        }
        Ok(())
    }
}
