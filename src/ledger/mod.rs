// Ledger module - THE BALANCES
// Capped native asset, uncapped reference asset, and the capability
// interface the exchange talks to

mod book;
mod events;
mod native;
mod reference;
mod traits;

pub use book::Book;
pub use events::{EventLog, EventRecord, LedgerEvent};
pub use native::{Lifecycle, NativeLedger, NativeLedgerState};
pub use reference::{ReferenceLedger, ReferenceLedgerState};
pub use traits::{Checkpoint, FungibleLedger, LedgerError, TokenConfig, DECIMALS, UNLIMITED_ALLOWANCE};
