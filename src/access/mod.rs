// Access module - who may call what, and when
// Administrator ownership, the pause gate, and the reentrancy guard

mod admin;
mod guard;
mod pause;

pub use admin::Administrator;
pub use guard::{Entered, ReentrancyError, ReentrancyGuard};
pub use pause::{PauseGate, PausedError};

use thiserror::Error;

/// Errors raised by the access controls
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("Caller is not the administrator")]
    Unauthorized,

    #[error("Address must not be the zero address")]
    InvalidAddress,
}
