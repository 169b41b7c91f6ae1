// Exchange module - THE SALE
// Custodies both assets and swaps one for the other at an administrator-set rate

mod events;
mod sale;

pub use events::{Asset, ExchangeEvent};
pub use sale::{Exchange, ExchangeError, ExchangeState};
