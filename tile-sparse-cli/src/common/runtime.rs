//! Progress reporting for parallel tensor work.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe progress tracker for parallel operations.
pub struct ProgressTracker {
    processed: AtomicUsize,
    total: usize,
    label: String,
}

impl ProgressTracker {
    pub fn new(total: usize, label: impl Into<String>) -> Self {
        Self {
            processed: AtomicUsize::new(0),
            total,
            label: label.into(),
        }
    }

    /// Increment and display with the name of the finished item.
    pub fn increment_with_extra(&self, extra: &str) {
        let current = self.advance();
        eprint!("\r{}: {}/{} {}", self.label, current, self.total, extra);
        let _ = std::io::stderr().flush();
    }

    /// Number of items finished so far.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Print newline after progress is complete.
    pub fn finish(&self) {
        eprintln!();
    }

    fn advance(&self) -> usize {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }
}
