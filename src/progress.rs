//! Progress-reporter trait for pipeline events.
//!
//! Pass an [`Arc<dyn ProgressReporter>`] to [`crate::Converter::with_reporter`] to
//! receive events as documents, units and enhancement groups are processed.
//! The library never writes to the terminal itself; the CLI renders these
//! events with a progress bar, tests count them.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docvision::ProgressReporter;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct PauseCounter(AtomicUsize);
//!
//! impl ProgressReporter for PauseCounter {
//!     fn on_pause(&self, _duration: Duration) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::output::ExtractionContext;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Receives pipeline events. All methods default to no-ops.
///
/// The pipeline is sequential, so events arrive in order: a unit's
/// `on_unit_complete`/`on_unit_error` always precedes the next
/// `on_unit_start`. Implementations must still be `Send + Sync` because the
/// reporter is shared through an `Arc`.
pub trait ProgressReporter: Send + Sync {
    /// A document is about to be converted.
    ///
    /// * `index` / `total`: 1-based position within a directory run
    ///   (`1`/`1` for a single file)
    fn on_document_start(&self, path: &Path, index: usize, total: usize) {
        let _ = (path, index, total);
    }

    /// Rendering finished and unit extraction is starting.
    fn on_units_start(&self, context: ExtractionContext, total_units: usize) {
        let _ = (context, total_units);
    }

    /// The request for a unit is about to be sent.
    fn on_unit_start(&self, ordinal: usize, total: usize) {
        let _ = (ordinal, total);
    }

    /// A unit was extracted; `text_len` is the byte length of its body.
    fn on_unit_complete(&self, ordinal: usize, total: usize, text_len: usize) {
        let _ = (ordinal, total, text_len);
    }

    /// A unit failed and was replaced by a placeholder.
    fn on_unit_error(&self, ordinal: usize, total: usize, error: &str) {
        let _ = (ordinal, total, error);
    }

    /// An enhancement group is about to be sent (1-based `group`).
    fn on_group_start(&self, group: usize, total_groups: usize) {
        let _ = (group, total_groups);
    }

    /// An enhancement group finished; `applied` is false on fallback.
    fn on_group_complete(&self, group: usize, total_groups: usize, applied: bool) {
        let _ = (group, total_groups, applied);
    }

    /// The pipeline is about to sleep for the pacing interval.
    fn on_pause(&self, duration: Duration) {
        let _ = duration;
    }

    /// A document was written to `output`.
    fn on_document_complete(&self, input: &Path, output: &Path) {
        let _ = (input, output);
    }

    /// A document failed; in directory mode the run continues.
    fn on_document_error(&self, input: &Path, error: &str) {
        let _ = (input, error);
    }
}

/// A no-op reporter, the default when none is supplied.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {}

/// Shared reporter handle as stored by [`crate::Converter`].
pub type Reporter = Arc<dyn ProgressReporter>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingReporter {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        pauses: AtomicUsize,
    }

    impl ProgressReporter for TrackingReporter {
        fn on_unit_start(&self, _ordinal: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _ordinal: usize, _total: usize, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _ordinal: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_pause(&self, _duration: Duration) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_reporter_does_not_panic() {
        let r = NoopReporter;
        r.on_document_start(Path::new("a.pdf"), 1, 1);
        r.on_unit_start(1, 2);
        r.on_unit_complete(1, 2, 10);
        r.on_unit_error(2, 2, "boom");
        r.on_group_start(1, 1);
        r.on_group_complete(1, 1, false);
        r.on_pause(Duration::from_secs(1));
        r.on_document_complete(Path::new("a.pdf"), Path::new("a.md"));
        r.on_document_error(Path::new("b.pdf"), "bad");
    }

    #[test]
    fn tracking_reporter_receives_events() {
        let tracker = TrackingReporter::default();
        tracker.on_unit_start(1, 2);
        tracker.on_unit_complete(1, 2, 5);
        tracker.on_pause(Duration::ZERO);
        tracker.on_unit_start(2, 2);
        tracker.on_unit_error(2, 2, "timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pauses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_reporter_works() {
        let r: Reporter = Arc::new(NoopReporter);
        r.on_units_start(ExtractionContext::Slide, 3);
    }
}
