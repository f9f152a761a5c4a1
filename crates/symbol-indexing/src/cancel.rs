//! Cooperative cancellation for one pipeline run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Abort signal polled by the scanner and presenter between steps.
///
/// Clones share the same flag. The orchestrator resets it at the start
/// of each run; the presenter resets it after aborting on it.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        flag.cancel();
        flag.cancel();
        assert!(observer.is_cancelled());

        observer.reset();
        assert!(!flag.is_cancelled());
    }
}
