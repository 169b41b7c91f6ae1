// SaleStore tests: snapshot both ledgers and the exchange, reopen, resume

use capsale::exchange::{Exchange, ExchangeEvent};
use capsale::identity::Address;
use capsale::ledger::{FungibleLedger, Lifecycle, NativeLedger, ReferenceLedger, TokenConfig};
use capsale::storage::{SaleStore, StoreError};
use std::sync::Arc;
use tempfile::TempDir;

fn admin() -> Address {
    Address::from_label("admin")
}

fn buyer() -> Address {
    Address::from_label("buyer")
}

fn exchange_address() -> Address {
    Address::from_label("exchange")
}

fn run_sale() -> (Arc<NativeLedger>, Arc<ReferenceLedger>, Exchange) {
    let native = Arc::new(
        NativeLedger::new(
            Address::from_label("native"),
            TokenConfig::native("Sale Token", "SALE", 1_000_000).with_initial_supply(10_000),
            admin(),
        )
        .unwrap(),
    );
    let reference = Arc::new(
        ReferenceLedger::new(
            Address::from_label("reference"),
            TokenConfig::reference("Reference Dollar", "RUSD"),
            admin(),
        )
        .unwrap(),
    );
    let exchange = Exchange::new(exchange_address(), admin(), native.clone(), reference.clone()).unwrap();

    native.set_distribution_channel(&admin(), &exchange_address()).unwrap();
    native.transfer(&admin(), &exchange_address(), 5_000).unwrap();
    native.handoff_to_distribution_channel(&admin()).unwrap();
    exchange.update_rate(&admin(), 250).unwrap();
    reference.mint(&admin(), &buyer(), 10_000).unwrap();
    reference.approve(&buyer(), &exchange_address(), 10_000).unwrap();
    exchange.purchase(&buyer(), 2_500).unwrap();

    (native, reference, exchange)
}

#[test]
fn test_new_store_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = SaleStore::open(temp_dir.path()).unwrap();

    assert!(store.is_empty());
    assert!(store.load_native_ledger().unwrap().is_none());
    assert!(store.load_reference_ledger().unwrap().is_none());
}

#[test]
fn test_full_sale_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let (native, reference, exchange) = run_sale();
        let store = SaleStore::open(temp_dir.path()).unwrap();
        store.save_native_ledger(&native).unwrap();
        store.save_reference_ledger(&reference).unwrap();
        store.save_exchange(&exchange).unwrap();
        store.flush().unwrap();
        assert_eq!(store.stats().key_count, 3);
    }

    let store = SaleStore::open(temp_dir.path()).unwrap();
    let native = Arc::new(store.load_native_ledger().unwrap().unwrap());
    let reference = Arc::new(store.load_reference_ledger().unwrap().unwrap());
    let exchange = store
        .load_exchange(native.clone(), reference.clone())
        .unwrap()
        .unwrap();

    assert_eq!(native.balance_of(&buyer()), 10);
    assert_eq!(native.administrator(), exchange_address());
    assert_eq!(native.lifecycle(), Lifecycle::HandedOff);
    assert_eq!(native.remaining_mintable(), 990_000);
    assert_eq!(reference.balance_of(&buyer()), 7_500);
    assert_eq!(reference.allowance(&buyer(), &exchange_address()), 7_500);
    assert_eq!(exchange.rate(), 250);
    assert_eq!(exchange.reference_asset_balance(), 2_500);
    assert_eq!(exchange.native_asset_balance(), 4_990);
    assert!(matches!(
        exchange.events().last().map(|r| r.event().clone()),
        Some(ExchangeEvent::Purchased { tokens_received: 10, .. })
    ));

    // The restored sale keeps trading
    assert_eq!(exchange.purchase(&buyer(), 500).unwrap(), 2);
    assert_eq!(native.balance_of(&buyer()), 12);
}

#[test]
fn test_exchange_requires_matching_ledgers() {
    let temp_dir = TempDir::new().unwrap();
    let (native, reference, exchange) = run_sale();
    let store = SaleStore::open(temp_dir.path()).unwrap();
    store.save_exchange(&exchange).unwrap();

    let result = store.load_exchange(reference.clone(), native.clone());

    assert!(matches!(result, Err(StoreError::DeserializationFailed(_))));
}

#[test]
fn test_snapshot_refused_inside_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let (native, _, _) = run_sale();
    let store = SaleStore::open(temp_dir.path()).unwrap();

    let cp = native.checkpoint();
    assert!(matches!(store.save_native_ledger(&native), Err(StoreError::SnapshotFailed(_))));
    native.commit(cp).unwrap();

    store.save_native_ledger(&native).unwrap();
}
