//! Progress reporting for clustering runs and forecast series.
//!
//! The engine reports one unit per completed K-means run and one per
//! forecast series. Binaries render this with `indicatif`; library callers
//! that don't care pass [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from an analytics request.
///
/// Called from `rayon` worker threads, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of runs or series the current stage will process.
    fn set_total(&self, total: u64);

    /// Marks `delta` more runs or series as done.
    fn inc(&self, delta: u64);

    /// Names the stage currently running.
    fn set_message(&self, msg: String);

    /// Ends the stage with a summary line.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
