//! Reentrancy flag handling.
//!
//! The execution that flips the flag on is the only one that flips it back off. Nested
//! executions observe the flag and leave it alone.

use crate::state::KeyManagerState;

/// Scoped hold on the reentrancy flag, released on drop.
pub struct ReentrancyGuard<'a, S: KeyManagerState> {
    state: &'a mut S,
    owner: bool,
}

impl<'a, S: KeyManagerState> ReentrancyGuard<'a, S> {
    pub fn enter(state: &'a mut S) -> Self {
        let owner = acquire(state);
        Self { state, owner }
    }
}

impl<S: KeyManagerState> Drop for ReentrancyGuard<'_, S> {
    fn drop(&mut self) {
        if self.owner {
            release(self.state);
        }
    }
}

/// Set the flag. Returns false if it was already set.
pub fn acquire<S: KeyManagerState>(state: &mut S) -> bool {
    if state.reentrancy_status() {
        return false;
    }
    state.set_reentrancy_status(true);
    true
}

pub fn release<S: KeyManagerState>(state: &mut S) {
    state.set_reentrancy_status(false);
}
