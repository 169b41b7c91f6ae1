// capsale - command line driver
//
// `simulate` walks one sale through its whole lifecycle in memory;
// `inspect` reads back what `simulate --store` persisted.

use capsale::exchange::{Exchange, ExchangeError};
use capsale::identity::Address;
use capsale::ledger::{FungibleLedger, LedgerError, NativeLedger, ReferenceLedger, TokenConfig, DECIMALS};
use capsale::storage::{SaleStore, StoreError};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "capsale", version, about = "Capped-supply token sale at a fixed exchange rate")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy both ledgers and the exchange in memory and run one purchase
    Simulate(SimulateArgs),
    /// Print the state persisted by `simulate --store`
    Inspect {
        /// Store directory
        #[arg(long)]
        store: PathBuf,
    },
}

#[derive(Args)]
struct SimulateArgs {
    /// Native supply cap, in base units
    #[arg(long, default_value_t = 1_000_000_000_000)]
    cap: u64,

    /// Native units minted to the administrator at creation
    #[arg(long, default_value_t = 600_000_000_000)]
    initial_supply: u64,

    /// Native units the administrator hands to the exchange for sale
    #[arg(long, default_value_t = 500_000_000_000)]
    inventory: u64,

    /// Reference units per native unit
    #[arg(long, default_value_t = 250)]
    rate: u64,

    /// Reference units minted to the buyer
    #[arg(long, default_value_t = 10_000_000)]
    buyer_funds: u64,

    /// Reference units the buyer pays
    #[arg(long, default_value_t = 1_000_000)]
    payment: u64,

    /// Persist the resulting state to this directory
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("exchange: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("store has no {0} snapshot")]
    MissingSnapshot(&'static str),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("capsale=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("capsale=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let result = match cli.command {
        Command::Simulate(args) => simulate(args),
        Command::Inspect { store } => inspect(store),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn simulate(args: SimulateArgs) -> Result<(), CliError> {
    let admin = Address::from_label("admin");
    let buyer = Address::from_label("buyer");
    let exchange_address = Address::from_label("exchange");

    let native = Arc::new(NativeLedger::new(
        Address::from_label("ledger:native"),
        TokenConfig::native("Sale Token", "SALE", args.cap).with_initial_supply(args.initial_supply),
        admin,
    )?);
    let reference = Arc::new(ReferenceLedger::new(
        Address::from_label("ledger:reference"),
        TokenConfig::reference("Reference Dollar", "RUSD"),
        admin,
    )?);
    let exchange = Exchange::new(exchange_address, admin, native.clone(), reference.clone())?;

    native.set_distribution_channel(&admin, &exchange_address)?;
    native.transfer(&admin, &exchange_address, args.inventory)?;
    native.handoff_to_distribution_channel(&admin)?;
    exchange.update_rate(&admin, args.rate)?;

    reference.mint(&admin, &buyer, args.buyer_funds)?;
    reference.approve(&buyer, &exchange_address, args.payment)?;
    let tokens = exchange.purchase(&buyer, args.payment)?;
    info!(tokens, "simulation purchase complete");

    println!("purchase: paid {} RUSD, received {} SALE", units(args.payment), units(tokens));
    print_summary(&native, &reference, &exchange, &[("admin", admin), ("buyer", buyer)]);

    if let Some(path) = args.store {
        let store = SaleStore::open(&path)?;
        store.save_native_ledger(&native)?;
        store.save_reference_ledger(&reference)?;
        store.save_exchange(&exchange)?;
        store.flush()?;
        println!("state saved to {}", path.display());
    }

    Ok(())
}

fn inspect(path: PathBuf) -> Result<(), CliError> {
    let store = SaleStore::open(&path)?;
    let native = Arc::new(store.load_native_ledger()?.ok_or(CliError::MissingSnapshot("native ledger"))?);
    let reference = Arc::new(
        store
            .load_reference_ledger()?
            .ok_or(CliError::MissingSnapshot("reference ledger"))?,
    );
    let exchange = store
        .load_exchange(native.clone(), reference.clone())?
        .ok_or(CliError::MissingSnapshot("exchange"))?;

    let stats = store.stats();
    println!("store: {} keys, {} bytes on disk", stats.key_count, stats.disk_size_bytes);
    print_summary(
        &native,
        &reference,
        &exchange,
        &[("admin", Address::from_label("admin")), ("buyer", Address::from_label("buyer"))],
    );
    Ok(())
}

fn print_summary(native: &NativeLedger, reference: &ReferenceLedger, exchange: &Exchange, accounts: &[(&str, Address)]) {
    println!(
        "{}: issued {} of {} (remaining {}), paused: {}, lifecycle: {:?}, holders: {}",
        native.symbol(),
        units(native.total_supply()),
        units(native.supply_cap()),
        units(native.remaining_mintable()),
        native.is_paused(),
        native.lifecycle(),
        native.holder_count(),
    );
    println!("{}: issued {}", reference.symbol(), units(reference.total_supply()));
    println!(
        "exchange {}: rate {}, holds {} {} and {} {}",
        exchange.address(),
        exchange.rate(),
        units(exchange.native_asset_balance()),
        native.symbol(),
        units(exchange.reference_asset_balance()),
        reference.symbol(),
    );
    for (label, address) in accounts {
        println!(
            "{:>8}: {} {}, {} {}",
            label,
            units(native.balance_of(address)),
            native.symbol(),
            units(reference.balance_of(address)),
            reference.symbol(),
        );
    }
    println!(
        "audit trail: {} native, {} reference, {} exchange events",
        native.events().len(),
        reference.events().len(),
        exchange.events().len(),
    );
    for record in exchange.events() {
        println!("  #{} {} {:?}", record.sequence(), record.recorded_at().to_rfc3339(), record.event());
    }
}

/// Render base units with the shared decimal scale
fn units(amount: u64) -> String {
    let scale = 10u64.pow(DECIMALS as u32);
    format!("{}.{:0width$}", amount / scale, amount % scale, width = DECIMALS as usize)
}
