//! Single-flight gate over watchlist-mutating workflows.
//!
//! A request that finds the latch busy is dropped, not queued.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Idle,
    Busy,
}

#[derive(Debug, Clone)]
pub struct OperationLatch {
    state: Arc<Mutex<LatchState>>,
}

impl OperationLatch {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LatchState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LatchState> {
        // The state is a plain token, a poisoned lock still holds a valid one
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> LatchState {
        *self.lock()
    }

    /// Grants the latch when idle. The workflow holds it until the returned
    /// guard is dropped.
    pub fn try_enter(&self, workflow: &'static str) -> Option<LatchGuard> {
        let mut state = self.lock();
        match *state {
            LatchState::Busy => {
                debug!(workflow, "Latch busy, dropping request");
                None
            }
            LatchState::Idle => {
                *state = LatchState::Busy;
                debug!(workflow, "Latch acquired");
                Some(LatchGuard {
                    latch: self.clone(),
                    workflow,
                })
            }
        }
    }

    fn exit(&self) {
        *self.lock() = LatchState::Idle;
    }
}

impl Default for OperationLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct LatchGuard {
    latch: OperationLatch,
    workflow: &'static str,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.latch.exit();
        debug!(workflow = self.workflow, "Latch released");
    }
}
