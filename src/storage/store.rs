// SaleStore - Persistent key-value storage using sled
//
// Holds the committed snapshots of:
// - the native ledger
// - the reference ledger
// - the exchange

use crate::exchange::{Exchange, ExchangeError, ExchangeState};
use crate::ledger::{
    FungibleLedger, LedgerError, NativeLedger, NativeLedgerState, ReferenceLedger, ReferenceLedgerState,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Key prefixes for organizing data
mod keys {
    pub const NATIVE_LEDGER: &[u8] = b"ledger:native";
    pub const REFERENCE_LEDGER: &[u8] = b"ledger:reference";
    pub const EXCHANGE: &[u8] = b"exchange:state";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Snapshot could not be taken: {0}")]
    SnapshotFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store for sale snapshots
///
/// Uses sled for crash-safe, embedded storage.
/// All writes are atomic and durable after flush.
pub struct SaleStore {
    db: sled::Db,
}

impl SaleStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        debug!(key = %String::from_utf8_lossy(key), bytes = value.len(), "snapshot written");
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    // ========================================================================
    // LEDGERS
    // ========================================================================

    /// Save the native ledger's committed state
    pub fn save_native_ledger(&self, ledger: &NativeLedger) -> Result<(), StoreError> {
        let state = ledger
            .export_state()
            .map_err(|e| StoreError::SnapshotFailed(e.to_string()))?;
        self.put(keys::NATIVE_LEDGER, &state.to_bytes())
    }

    /// Load the native ledger
    pub fn load_native_ledger(&self) -> Result<Option<NativeLedger>, StoreError> {
        match self.get(keys::NATIVE_LEDGER)? {
            Some(bytes) => {
                let ledger = NativeLedgerState::from_bytes(&bytes)
                    .and_then(NativeLedger::from_state)
                    .map_err(|e: LedgerError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    /// Save the reference ledger's committed state
    pub fn save_reference_ledger(&self, ledger: &ReferenceLedger) -> Result<(), StoreError> {
        let state = ledger
            .export_state()
            .map_err(|e| StoreError::SnapshotFailed(e.to_string()))?;
        self.put(keys::REFERENCE_LEDGER, &state.to_bytes())
    }

    /// Load the reference ledger
    pub fn load_reference_ledger(&self) -> Result<Option<ReferenceLedger>, StoreError> {
        match self.get(keys::REFERENCE_LEDGER)? {
            Some(bytes) => {
                let ledger = ReferenceLedgerState::from_bytes(&bytes)
                    .and_then(ReferenceLedger::from_state)
                    .map_err(|e: LedgerError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // EXCHANGE
    // ========================================================================

    /// Save the exchange state
    pub fn save_exchange(&self, exchange: &Exchange) -> Result<(), StoreError> {
        let state = exchange
            .export_state()
            .map_err(|e| StoreError::SnapshotFailed(e.to_string()))?;
        self.put(keys::EXCHANGE, &state.to_bytes())
    }

    /// Load the exchange, reattaching it to the given ledgers
    pub fn load_exchange(
        &self,
        native: Arc<dyn FungibleLedger>,
        reference: Arc<dyn FungibleLedger>,
    ) -> Result<Option<Exchange>, StoreError> {
        match self.get(keys::EXCHANGE)? {
            Some(bytes) => {
                let exchange = ExchangeState::from_bytes(&bytes)
                    .and_then(|state| Exchange::restore(state, native, reference))
                    .map_err(|e: ExchangeError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(exchange))
            }
            None => Ok(None),
        }
    }
}
