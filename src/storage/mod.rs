// Storage module - PERSISTENCE
// Snapshots of ledgers and the exchange in an embedded sled database

mod store;

pub use store::{SaleStore, StorageStats, StoreError};
