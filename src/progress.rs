//! Injected progress reporting.
//!
//! Long-running stages (tile downloads, per-cell partitioning, per-chunk
//! extraction) report through an observer supplied by the caller instead of
//! printing to ambient global state, so the core stays testable without I/O
//! side effects.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Observer for long-running stage progress.
///
/// Implementations must be thread-safe: stages may advance from a worker
/// pool. All methods default to no-ops so observers implement only what
/// they care about.
pub trait ProgressObserver: Send + Sync {
    /// A stage with `total` units of work is starting.
    fn begin(&self, _stage: &str, _total: usize) {}

    /// One unit of work within the current stage finished.
    fn advance(&self) {}

    /// The stage completed.
    fn finish(&self, _stage: &str) {}
}

/// Observer that discards all events; the default for library callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Observer that counts events, mainly useful in tests.
#[derive(Debug, Default)]
pub struct CountingProgress {
    advanced: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advanced(&self) -> usize {
        self.advanced.load(Ordering::Relaxed)
    }
}

impl ProgressObserver for CountingProgress {
    fn advance(&self) {
        self.advanced.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_progress() {
        let progress = CountingProgress::new();
        progress.begin("stage", 3);
        progress.advance();
        progress.advance();
        progress.finish("stage");
        assert_eq!(progress.advanced(), 2);
    }

    #[test]
    fn test_noop_progress_is_object_safe() {
        let observer: &dyn ProgressObserver = &NoProgress;
        observer.begin("stage", 1);
        observer.advance();
        observer.finish("stage");
    }
}
