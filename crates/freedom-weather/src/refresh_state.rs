//! Refresh state machine.
//!
//! Ensures only one refresh runs at a time. Triggers that arrive while a
//! refresh is in flight are coalesced into it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::RefreshTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Busy(RefreshTrigger),
}

impl RefreshState {
    /// True if a new refresh can be started.
    pub fn can_start_refresh(self) -> bool {
        matches!(self, RefreshState::Idle)
    }

    /// State after a refresh finishes, whatever its outcome.
    pub fn on_refresh_done(self) -> Self {
        RefreshState::Idle
    }
}

/// Shared single-flight gate around [`RefreshState`].
#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    state: Arc<Mutex<RefreshState>>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RefreshState {
        *self.state.lock()
    }

    /// Claim the gate for `trigger`. Returns `None` when a refresh is
    /// already running; the claim is released when the guard drops.
    pub fn try_begin(&self, trigger: RefreshTrigger) -> Option<RefreshGuard> {
        let mut state = self.state.lock();
        if !state.can_start_refresh() {
            return None;
        }
        *state = RefreshState::Busy(trigger);
        Some(RefreshGuard {
            state: self.state.clone(),
        })
    }
}

#[derive(Debug)]
pub struct RefreshGuard {
    state: Arc<Mutex<RefreshState>>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        *state = state.on_refresh_done();
    }
}
