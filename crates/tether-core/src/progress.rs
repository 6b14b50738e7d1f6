//! Per-run progress aggregation.
//!
//! A cloneable counter passed into each concurrent unit; exposes only
//! increment-and-report, never a shared mutable counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Task-safe completion counter for one labelled phase.
#[derive(Debug, Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    label: String,
    total: usize,
    done: AtomicUsize,
}

impl Progress {
    /// Create a counter expecting `total` completions.
    #[must_use]
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                label: label.into(),
                total,
                done: AtomicUsize::new(0),
            }),
        }
    }

    /// Record one completion and return the running count.
    pub fn tick(&self, item: &str) -> usize {
        let done = self.inner.done.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            phase = %self.inner.label,
            item,
            done,
            total = self.inner.total,
            "completed"
        );
        done
    }

    /// How many completions have been recorded.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.inner.done.load(Ordering::Relaxed)
    }

    /// Whether every expected completion has been recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed() >= self.inner.total
    }
}
