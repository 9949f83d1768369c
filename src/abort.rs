use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coarse cancellation for long sweeps. Checked between stations or satellites,
/// never inside a single time-step scan.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
