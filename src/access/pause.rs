// Pause gate - blocks balance movements, nothing else

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Transfers are paused")]
pub struct PausedError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseGate {
    paused: bool,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the flag, returning the previous value
    pub fn set(&mut self, paused: bool) -> bool {
        std::mem::replace(&mut self.paused, paused)
    }

    /// Fail with `Paused` while the gate is closed
    pub fn ensure_open(&self) -> Result<(), PausedError> {
        if self.paused {
            return Err(PausedError);
        }
        Ok(())
    }
}
