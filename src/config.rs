//! Reconciler configuration.

use std::time::Duration;

use crate::error::ReconcileError;

/// Timing knobs for the work loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Minimum time that must be left in a slice to start another unit of
    /// work. The loop yields as soon as the remaining time drops to this.
    pub enough_time: Duration,
    /// Slice length [`flush`](crate::Reconciler::flush) grants per slice.
    pub slice: Duration,
}

impl ReconcilerConfig {
    /// 1ms threshold, 16ms slices (one frame at 60Hz).
    pub const fn new() -> Self {
        Self {
            enough_time: Duration::from_millis(1),
            slice: Duration::from_millis(16),
        }
    }

    pub const fn with_enough_time(mut self, enough_time: Duration) -> Self {
        self.enough_time = enough_time;
        self
    }

    pub const fn with_slice(mut self, slice: Duration) -> Self {
        self.slice = slice;
        self
    }

    /// Reject configurations where no slice could ever admit work.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.slice <= self.enough_time {
            return Err(ReconcileError::SliceTooShort {
                slice_ms: self.slice.as_millis(),
                enough_ms: self.enough_time.as_millis(),
            });
        }
        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new()
    }
}
