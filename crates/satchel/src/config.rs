//! Engine configuration threaded through constructors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation signal, checked between entries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Host-supplied engine options.
///
/// There is no global context: every validator and bagger receives its
/// configuration explicitly.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Pause between opening files, for UI pacing. Zero disables it.
    pub slow_motion_delay: Duration,
    /// Skip the serialization-format phase entirely.
    pub disable_serialization_check: bool,
    /// Cooperative cancellation; the engine stops opening new entries once
    /// set, drains what is in flight, and still signals the end of the run.
    pub cancel: CancelToken,
}

impl EngineConfig {
    pub fn pace(&self) {
        if !self.slow_motion_delay.is_zero() {
            std::thread::sleep(self.slow_motion_delay);
        }
    }
}
