use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two ledgers an operation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The capped asset being sold
    Native,
    /// The payment asset
    Reference,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Reference => write!(f, "reference"),
        }
    }
}

/// Events emitted by the exchange
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    Purchased {
        buyer: Address,
        amount_paid: u64,
        tokens_received: u64,
    },
    RateUpdated {
        previous: u64,
        rate: u64,
    },
    Withdrawn {
        asset: Asset,
        to: Address,
        amount: u64,
    },
    AdministrationTransferred {
        previous: Address,
        administrator: Address,
    },
}
