// Reference ledger tests: uncapped faucet minting and the shared
// balance/allowance contract

use capsale::identity::Address;
use capsale::ledger::{FungibleLedger, LedgerError, LedgerEvent, ReferenceLedger, TokenConfig};

fn admin() -> Address {
    Address::from_label("admin")
}

fn alice() -> Address {
    Address::from_label("alice")
}

fn bob() -> Address {
    Address::from_label("bob")
}

fn create_ledger() -> ReferenceLedger {
    ReferenceLedger::new(
        Address::from_label("reference"),
        TokenConfig::reference("Reference Dollar", "RUSD"),
        admin(),
    )
    .unwrap()
}

#[test]
fn test_capped_config_rejected() {
    let config = TokenConfig::reference("Reference Dollar", "RUSD").with_supply_cap(10);
    let result = ReferenceLedger::new(Address::from_label("reference"), config, admin());
    assert!(matches!(result, Err(LedgerError::InvalidConfig(_))));
}

#[test]
fn test_empty_symbol_rejected() {
    let config = TokenConfig::reference("Reference Dollar", "");
    let result = ReferenceLedger::new(Address::from_label("reference"), config, admin());
    assert!(matches!(result, Err(LedgerError::InvalidConfig(_))));
}

#[test]
fn test_initial_supply_minted_to_admin() {
    let config = TokenConfig::reference("Reference Dollar", "RUSD").with_initial_supply(42);
    let ledger = ReferenceLedger::new(Address::from_label("reference"), config, admin()).unwrap();
    assert_eq!(ledger.balance_of(&admin()), 42);
    assert_eq!(ledger.total_supply(), 42);
}

#[test]
fn test_mint_is_unbounded_but_admin_only() {
    let ledger = create_ledger();
    ledger.mint(&admin(), &alice(), u64::MAX / 2).unwrap();
    ledger.mint(&admin(), &bob(), u64::MAX / 2).unwrap();

    assert_eq!(ledger.total_supply(), (u64::MAX / 2) * 2);
    assert_eq!(ledger.mint(&alice(), &alice(), 1), Err(LedgerError::Unauthorized));
}

#[test]
fn test_mint_past_u64_overflows() {
    let ledger = create_ledger();
    ledger.mint(&admin(), &alice(), u64::MAX).unwrap();

    assert_eq!(ledger.mint(&admin(), &bob(), 1), Err(LedgerError::Overflow));
    assert_eq!(ledger.balance_of(&bob()), 0);
}

#[test]
fn test_transfer_and_allowance() {
    let ledger = create_ledger();
    ledger.mint(&admin(), &alice(), 1_000).unwrap();

    ledger.transfer(&alice(), &bob(), 300).unwrap();
    ledger.approve(&bob(), &alice(), 100).unwrap();
    ledger.transfer_from(&alice(), &bob(), &alice(), 100).unwrap();

    assert_eq!(ledger.balance_of(&alice()), 800);
    assert_eq!(ledger.balance_of(&bob()), 200);
    assert_eq!(ledger.allowance(&bob(), &alice()), 0);
}

#[test]
fn test_transfer_from_checks_allowance_then_balance_then_recipient() {
    let ledger = create_ledger();
    ledger.mint(&admin(), &alice(), 10).unwrap();
    ledger.approve(&alice(), &bob(), 20).unwrap();

    assert_eq!(
        ledger.transfer_from(&bob(), &alice(), &Address::ZERO, 21),
        Err(LedgerError::InsufficientAllowance {
            available: 20,
            required: 21
        })
    );
    assert_eq!(
        ledger.transfer_from(&bob(), &alice(), &Address::ZERO, 11),
        Err(LedgerError::InsufficientBalance {
            available: 10,
            required: 11
        })
    );
    assert_eq!(
        ledger.transfer_from(&bob(), &alice(), &Address::ZERO, 10),
        Err(LedgerError::InvalidRecipient)
    );
    assert_eq!(ledger.allowance(&alice(), &bob()), 20);
}

#[test]
fn test_events_record_each_success_once() {
    let ledger = create_ledger();
    ledger.mint(&admin(), &alice(), 10).unwrap();
    ledger.transfer(&alice(), &bob(), 4).unwrap();
    let _ = ledger.transfer(&alice(), &bob(), 100);

    let events: Vec<LedgerEvent> = ledger.events().iter().map(|r| r.event().clone()).collect();
    assert_eq!(
        events,
        vec![
            LedgerEvent::Issued { to: alice(), amount: 10 },
            LedgerEvent::Transfer {
                from: alice(),
                to: bob(),
                amount: 4
            },
        ]
    );
    let sequences: Vec<u64> = ledger.events().iter().map(|r| r.sequence()).collect();
    assert_eq!(sequences, vec![0, 1]);
}

#[test]
fn test_transfer_administration() {
    let ledger = create_ledger();
    ledger.transfer_administration(&admin(), &alice()).unwrap();

    assert_eq!(ledger.administrator(), alice());
    assert_eq!(ledger.mint(&admin(), &admin(), 1), Err(LedgerError::Unauthorized));
    ledger.mint(&alice(), &alice(), 1).unwrap();
    assert_eq!(
        ledger.transfer_administration(&alice(), &Address::ZERO),
        Err(LedgerError::InvalidAddress)
    );
}
