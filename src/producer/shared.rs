//! State shared between a view and its worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag handed to a worker at spawn.
///
/// Cloning shares the flag. One `SharedState` exists per producer, so
/// quitting one worker never affects another.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    quit: Arc<AtomicBool>,
}

impl SharedState {
    /// Fresh flag, not quitting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop at its next check.
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    /// Whether quit was requested.
    pub fn is_quit_requested(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }
}
