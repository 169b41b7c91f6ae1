// capsale - capped-supply token ledger and fixed-rate sale exchange
//
// Layers, leaf first:
// - identity: typed account identities
// - access:   administrator, pause gate, reentrancy guard
// - ledger:   native (capped, pausable) and reference (payment) ledgers
// - exchange: buys native units with reference units at a configured rate
// - storage:  sled-backed snapshots of all of the above

pub mod access;
pub mod exchange;
pub mod identity;
pub mod ledger;
pub mod storage;
