// Single-administrator authorization

use crate::access::AccessError;
use crate::identity::Address;
use serde::{Deserialize, Serialize};

/// The one identity allowed to run privileged operations on a component
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    current: Address,
}

impl Administrator {
    /// Install an initial administrator
    pub fn new(initial: Address) -> Result<Self, AccessError> {
        if initial.is_zero() {
            return Err(AccessError::InvalidAddress);
        }
        Ok(Self { current: initial })
    }

    /// The current administrator
    pub fn current(&self) -> Address {
        self.current
    }

    /// Check whether `caller` is the administrator
    pub fn is(&self, caller: &Address) -> bool {
        &self.current == caller
    }

    /// Fail with `Unauthorized` unless `caller` is the administrator
    pub fn ensure(&self, caller: &Address) -> Result<(), AccessError> {
        if !self.is(caller) {
            return Err(AccessError::Unauthorized);
        }
        Ok(())
    }

    /// Hand administration to `new_admin`, returning the previous holder
    pub fn transfer(&mut self, caller: &Address, new_admin: Address) -> Result<Address, AccessError> {
        self.ensure(caller)?;
        if new_admin.is_zero() {
            return Err(AccessError::InvalidAddress);
        }
        Ok(std::mem::replace(&mut self.current, new_admin))
    }
}
