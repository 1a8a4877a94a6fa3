//! Progress-callback trait for batch import and sync events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::LibraryConfigBuilder::progress_callback`] to receive
//! events as the import pool converts files and the sync worker writes
//! records.
//!
//! Both pipelines report the same triple after every item:
//! `(processed, total, failed)`, where `processed` counts successes and
//! failures alike.
//!
//! # Example
//!
//! ```rust
//! use recipebox::{BatchKind, BatchProgressCallback, LibraryConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_progress(&self, _kind: BatchKind, processed: usize, total: usize, failed: usize) {
//!         self.0.store(processed, Ordering::SeqCst);
//!         eprintln!("{processed}/{total} ({failed} failed)");
//!     }
//! }
//!
//! let config = LibraryConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::model::BatchSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which pipeline emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchKind {
    Import,
    Sync,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Import => f.write_str("import"),
            BatchKind::Sync => f.write_str("sync"),
        }
    }
}

/// Called by the import pool and the sync worker as they process items.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
///
/// Import events are delivered from the single task that drains the worker
/// pool, so they never overlap; the bounds exist so a callback can be held
/// in a config shared across tasks.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item starts.
    fn on_batch_start(&self, kind: BatchKind, total: usize) {
        let _ = (kind, total);
    }

    /// Called after every item, success or failure.
    ///
    /// # Arguments
    /// * `processed`: items finished so far (succeeded + failed)
    /// * `total`: items in the batch
    /// * `failed`: failures so far
    fn on_progress(&self, kind: BatchKind, processed: usize, total: usize, failed: usize) {
        let _ = (kind, processed, total, failed);
    }

    /// Called when one item fails. `name` is the file name for imports and
    /// the record title for syncs.
    fn on_item_error(&self, kind: BatchKind, name: &str, error: &str) {
        let _ = (kind, name, error);
    }

    /// Called once after the batch has drained.
    fn on_batch_complete(&self, kind: BatchKind, summary: &BatchSummary) {
        let _ = (kind, summary);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::LibraryConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        last_processed: AtomicUsize,
        errors: AtomicUsize,
        completed_ok: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, _kind: BatchKind, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_progress(&self, _kind: BatchKind, processed: usize, _total: usize, _failed: usize) {
            self.last_processed.store(processed, Ordering::SeqCst);
        }

        fn on_item_error(&self, _kind: BatchKind, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _kind: BatchKind, summary: &BatchSummary) {
            self.completed_ok.store(summary.succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(BatchKind::Import, 5);
        cb.on_progress(BatchKind::Import, 1, 5, 0);
        cb.on_item_error(BatchKind::Sync, "Soup", "denied");
        cb.on_batch_complete(BatchKind::Sync, &BatchSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(BatchKind::Import, 3);
        tracker.on_progress(BatchKind::Import, 1, 3, 0);
        tracker.on_item_error(BatchKind::Import, "bad.png", "decode");
        tracker.on_progress(BatchKind::Import, 2, 3, 1);
        tracker.on_progress(BatchKind::Import, 3, 3, 1);
        tracker.on_batch_complete(
            BatchKind::Import,
            &BatchSummary {
                succeeded: 2,
                failed: 1,
            },
        );

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.last_processed.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_ok.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn batch_kind_display() {
        assert_eq!(BatchKind::Import.to_string(), "import");
        assert_eq!(BatchKind::Sync.to_string(), "sync");
    }
}
