//! Cooperative cancellation for multi-run computations.
//!
//! A long clustering request cannot be interrupted inside a single K-means
//! fit, but the flag is checked before each run and before each forecast
//! series, so a cancelled request stops at the next boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::AnalyticsError;

/// Shared flag that a caller raises to stop an in-flight request.
///
/// Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Creates a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`Self::cancel`] has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails with [`AnalyticsError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Cancelled`] when the flag is raised.
    pub fn check(&self) -> Result<(), AnalyticsError> {
        if self.is_cancelled() {
            Err(AnalyticsError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());

        other.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(AnalyticsError::Cancelled)));
    }
}
