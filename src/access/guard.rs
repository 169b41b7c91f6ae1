// Reentrancy guard
//
// One flag per component instance. Entering while the flag is set fails
// immediately. The flag is cleared when the returned `Entered` token drops.

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Returned when a guarded operation is entered while another is in flight
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Reentrant call rejected")]
pub struct ReentrancyError;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard, or fail if it is already held
    pub fn enter(&self) -> Result<Entered<'_>, ReentrancyError> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ReentrancyError)?;
        Ok(Entered { guard: self })
    }

    /// Whether a guarded operation is currently in flight
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof that the guard is held; releases it on drop
#[must_use = "the guard is released as soon as this value is dropped"]
#[derive(Debug)]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
