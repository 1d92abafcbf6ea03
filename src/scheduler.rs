//! Idle-time scheduling primitives.
//!
//! The work loop only needs two things from its host environment:
//! - a way to ask for a future time slice ([`IdleTask`])
//! - a probe for how much of the granted slice is left ([`Deadline`])
//!
//! # Pattern
//!
//! ```ignore
//! reconciler.render(tree, container);        // arms the idle task
//! while reconciler.wants_slice() {
//!     let deadline = SliceDeadline::new(Duration::from_millis(16));
//!     reconciler.perform_work(&deadline)?;   // re-arms if work remains
//! }
//! ```
//!
//! [`UnitBudget`] stands in for wall-clock time where interruption points
//! must be deterministic.

use std::cell::Cell;
use std::time::{Duration, Instant};

// =============================================================================
// Deadline
// =============================================================================

/// Remaining-time probe for one granted slice.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

impl<F: Fn() -> Duration> Deadline for F {
    fn time_remaining(&self) -> Duration {
        self()
    }
}

/// Wall-clock slice starting now.
#[derive(Debug, Clone, Copy)]
pub struct SliceDeadline {
    end: Instant,
}

impl SliceDeadline {
    pub fn new(length: Duration) -> Self {
        Self {
            end: Instant::now() + length,
        }
    }
}

impl Deadline for SliceDeadline {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

/// Slice that lasts for a fixed number of probes.
///
/// Each probe while budget is left reports `per_probe` remaining and uses up
/// one unit; afterwards it reports zero. The work loop probes once per unit of
/// work, so `UnitBudget::new(n, ..)` admits exactly `n` units.
#[derive(Debug)]
pub struct UnitBudget {
    left: Cell<usize>,
    per_probe: Duration,
}

impl UnitBudget {
    pub fn new(units: usize, per_probe: Duration) -> Self {
        Self {
            left: Cell::new(units),
            per_probe,
        }
    }

    /// Probes still answered with time left.
    pub fn remaining_units(&self) -> usize {
        self.left.get()
    }
}

impl Deadline for UnitBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.left.get();
        if left == 0 {
            return Duration::ZERO;
        }
        self.left.set(left - 1);
        self.per_probe
    }
}

// =============================================================================
// Idle Task
// =============================================================================

/// A cancellable, re-arming request for a future idle callback.
///
/// Repeated requests while armed collapse into one pending callback.
/// The host grants the callback by calling `perform_work`, which disarms the
/// task first and re-arms it if work remains.
#[derive(Debug, Default, Clone)]
pub struct IdleTask {
    armed: bool,
    requests: u64,
}

impl IdleTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a future slice.
    pub fn request(&mut self) {
        self.requests += 1;
        self.armed = true;
    }

    /// Withdraw a pending request.
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    /// Consume the pending request. Returns whether one was pending.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Total number of requests made, including collapsed ones.
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_budget_counts_probes() {
        let budget = UnitBudget::new(2, Duration::from_millis(5));

        assert_eq!(budget.time_remaining(), Duration::from_millis(5));
        assert_eq!(budget.time_remaining(), Duration::from_millis(5));
        assert_eq!(budget.time_remaining(), Duration::ZERO);
        assert_eq!(budget.remaining_units(), 0);
    }

    #[test]
    fn test_slice_deadline_expires() {
        let deadline = SliceDeadline::new(Duration::ZERO);
        assert_eq!(deadline.time_remaining(), Duration::ZERO);

        let deadline = SliceDeadline::new(Duration::from_secs(60));
        assert!(deadline.time_remaining() > Duration::from_secs(1));
    }

    #[test]
    fn test_closure_deadline() {
        let deadline = || Duration::from_millis(3);
        assert_eq!(deadline.time_remaining(), Duration::from_millis(3));
    }

    #[test]
    fn test_idle_task_collapses_requests() {
        let mut task = IdleTask::new();
        assert!(!task.take());

        task.request();
        task.request();
        assert!(task.is_armed());
        assert_eq!(task.requests(), 2);

        assert!(task.take());
        assert!(!task.is_armed());
        assert!(!task.take());
    }

    #[test]
    fn test_idle_task_cancel() {
        let mut task = IdleTask::new();
        task.request();
        task.cancel();
        assert!(!task.is_armed());
    }
}
