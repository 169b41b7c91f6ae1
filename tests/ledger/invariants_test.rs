// Property tests: supply conservation and the cap under random call
// sequences, with "no mutation on error" checked after every step

use capsale::exchange::Exchange;
use capsale::identity::Address;
use capsale::ledger::{FungibleLedger, NativeLedger, ReferenceLedger, TokenConfig};
use proptest::prelude::*;
use std::sync::Arc;

const CAP: u64 = 1_000_000;
const ACCOUNTS: usize = 4;

fn account(idx: usize) -> Address {
    Address::from_label(&format!("account-{}", idx))
}

fn admin() -> Address {
    account(0)
}

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    total_supply: u64,
    balances: Vec<u64>,
    allowances: Vec<u64>,
    events: usize,
}

impl Snapshot {
    fn take(ledger: &NativeLedger) -> Self {
        let balances = (0..ACCOUNTS).map(|i| ledger.balance_of(&account(i))).collect();
        let allowances = (0..ACCOUNTS)
            .flat_map(|o| (0..ACCOUNTS).map(move |s| (o, s)))
            .map(|(o, s)| ledger.allowance(&account(o), &account(s)))
            .collect();
        Self {
            total_supply: ledger.total_supply(),
            balances,
            allowances,
            events: ledger.events().len(),
        }
    }
}

// ============================================================================
// ACTIONS
// ============================================================================

#[derive(Clone, Debug)]
enum Action {
    Mint { caller: usize, to: usize, amount: u64 },
    Transfer { from: usize, to: usize, amount: u64 },
    Approve { owner: usize, spender: usize, amount: u64 },
    TransferFrom { spender: usize, from: usize, to: usize, amount: u64 },
    SetPaused { caller: usize, paused: bool },
}

fn idx() -> impl Strategy<Value = usize> {
    0..ACCOUNTS
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (prop_oneof![4 => Just(0usize), 1 => idx()], idx(), 0u64..400_000)
            .prop_map(|(caller, to, amount)| Action::Mint { caller, to, amount }),
        5 => (idx(), idx(), 0u64..300_000).prop_map(|(from, to, amount)| Action::Transfer { from, to, amount }),
        2 => (idx(), idx(), 0u64..300_000)
            .prop_map(|(owner, spender, amount)| Action::Approve { owner, spender, amount }),
        3 => (idx(), idx(), idx(), 0u64..300_000)
            .prop_map(|(spender, from, to, amount)| Action::TransferFrom { spender, from, to, amount }),
        1 => (idx(), any::<bool>()).prop_map(|(caller, paused)| Action::SetPaused { caller, paused }),
    ]
}

fn apply(ledger: &NativeLedger, action: &Action) -> bool {
    let result = match *action {
        Action::Mint { caller, to, amount } => ledger.mint(&account(caller), &account(to), amount),
        Action::Transfer { from, to, amount } => ledger.transfer(&account(from), &account(to), amount),
        Action::Approve { owner, spender, amount } => ledger.approve(&account(owner), &account(spender), amount),
        Action::TransferFrom {
            spender,
            from,
            to,
            amount,
        } => ledger.transfer_from(&account(spender), &account(from), &account(to), amount),
        Action::SetPaused { caller, paused } => ledger.set_paused(&account(caller), paused),
    };
    result.is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_supply_conserved_and_capped(actions in prop::collection::vec(action_strategy(), 1..60)) {
        let ledger = NativeLedger::new(
            Address::from_label("native"),
            TokenConfig::native("Sale Token", "SALE", CAP),
            admin(),
        )
        .unwrap();

        for action in &actions {
            let before = Snapshot::take(&ledger);
            let ok = apply(&ledger, action);
            let after = Snapshot::take(&ledger);

            if ok {
                prop_assert_eq!(after.events, before.events + 1, "{:?} must emit exactly one event", action);
            } else {
                prop_assert_eq!(&after, &before, "{:?} failed but mutated state", action);
            }

            prop_assert!(ledger.total_supply() <= CAP);
            prop_assert_eq!(ledger.sum_of_balances(), Some(ledger.total_supply()));
            prop_assert_eq!(ledger.total_supply() + ledger.remaining_mintable(), CAP);
        }
    }

    #[test]
    fn prop_purchase_conserves_both_assets(
        rate in 1u64..1_000,
        payments in prop::collection::vec(0u64..200_000, 1..20),
    ) {
        let exchange_address = Address::from_label("exchange");
        let buyer = account(1);

        let native = Arc::new(
            NativeLedger::new(
                Address::from_label("native"),
                TokenConfig::native("Sale Token", "SALE", CAP).with_initial_supply(CAP),
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
        let exchange = Exchange::new(exchange_address, admin(), native.clone(), reference.clone()).unwrap();
        native.transfer(&admin(), &exchange_address, 2_000).unwrap();
        exchange.update_rate(&admin(), rate).unwrap();
        reference.mint(&admin(), &buyer, 1_000_000).unwrap();
        reference.approve(&buyer, &exchange_address, u64::MAX).unwrap();

        for paid in payments {
            let buyer_ref = reference.balance_of(&buyer);
            let buyer_native = native.balance_of(&buyer);
            let inventory = exchange.native_asset_balance();
            let collected = exchange.reference_asset_balance();

            match exchange.purchase(&buyer, paid) {
                Ok(tokens) => {
                    prop_assert_eq!(tokens, paid / rate);
                    prop_assert!(tokens > 0);
                    prop_assert_eq!(reference.balance_of(&buyer), buyer_ref - paid);
                    prop_assert_eq!(exchange.reference_asset_balance(), collected + paid);
                    prop_assert_eq!(native.balance_of(&buyer), buyer_native + tokens);
                    prop_assert_eq!(exchange.native_asset_balance(), inventory - tokens);
                }
                Err(_) => {
                    prop_assert_eq!(reference.balance_of(&buyer), buyer_ref);
                    prop_assert_eq!(exchange.reference_asset_balance(), collected);
                    prop_assert_eq!(native.balance_of(&buyer), buyer_native);
                    prop_assert_eq!(exchange.native_asset_balance(), inventory);
                }
            }

            prop_assert_eq!(native.total_supply(), CAP);
            prop_assert_eq!(reference.total_supply(), 1_000_000);
        }
    }
}
