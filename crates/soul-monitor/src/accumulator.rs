//! # Usage Accumulator
//!
//! Folds the [`UsageCounters`] of every completion call made while servicing
//! one request into a single total.
//!
//! ## Design
//!
//! The accumulator is owned by the orchestrator driving the request. Faculty
//! tasks running concurrently hand their counters back with their results,
//! and the orchestrator records them at its fan-in point, so no locking is
//! needed. Because counter addition is commutative and associative, the total
//! does not depend on the order in which concurrent calls finish.
//!
//! ## Example
//!
//! ```rust
//! use soul_monitor::{UsageAccumulator, UsageCounters};
//!
//! let mut request = UsageAccumulator::new();
//! request.record(UsageCounters::new(10, 5, 0, 0));
//!
//! let mut escalation = UsageAccumulator::new();
//! escalation.record(UsageCounters::new(3, 2, 0, 0));
//!
//! request.merge(&escalation);
//! assert_eq!(request.calls(), 2);
//! assert_eq!(request.total(), UsageCounters::new(13, 7, 0, 0));
//! ```

use crate::usage::{UsageCounters, UsageSummary};
use tracing::trace;

/// Running usage total for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageAccumulator {
    /// Sum of all recorded counters.
    total: UsageCounters,
    /// Number of completion calls recorded.
    calls: u64,
}

impl UsageAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total: UsageCounters::zero(),
            calls: 0,
        }
    }

    /// Records the counters of one completion call.
    ///
    /// Calls that reported nothing (for example a call that faulted before
    /// the provider answered) still count toward [`calls`](Self::calls).
    pub fn record(&mut self, usage: UsageCounters) {
        self.total += usage;
        self.calls += 1;
        trace!(
            input = usage.input_tokens,
            output = usage.output_tokens,
            calls = self.calls,
            "usage recorded"
        );
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &UsageAccumulator) {
        self.total += other.total;
        self.calls += other.calls;
    }

    /// Returns the accumulated counters.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> UsageCounters {
        self.total
    }

    /// Returns the number of recorded calls.
    #[inline]
    #[must_use]
    pub const fn calls(&self) -> u64 {
        self.calls
    }

    /// Returns the accumulated counters with the derived total.
    #[must_use]
    pub const fn summary(&self) -> UsageSummary {
        self.total.summary()
    }

    /// Returns true if nothing has been recorded.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.calls == 0
    }
}

impl Extend<UsageCounters> for UsageAccumulator {
    fn extend<I: IntoIterator<Item = UsageCounters>>(&mut self, iter: I) {
        for usage in iter {
            self.record(usage);
        }
    }
}

impl FromIterator<UsageCounters> for UsageAccumulator {
    fn from_iter<I: IntoIterator<Item = UsageCounters>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.extend(iter);
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let acc = UsageAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.calls(), 0);
        assert!(acc.total().is_zero());
    }

    #[test]
    fn test_record_sums_counters() {
        let mut acc = UsageAccumulator::new();
        acc.record(UsageCounters::new(100, 20, 5, 0));
        acc.record(UsageCounters::new(50, 30, 0, 7));

        assert_eq!(acc.calls(), 2);
        assert_eq!(acc.total(), UsageCounters::new(150, 50, 5, 7));
        assert_eq!(acc.summary().total_tokens, 200);
    }

    #[test]
    fn test_zero_usage_still_counts_as_call() {
        let mut acc = UsageAccumulator::new();
        acc.record(UsageCounters::zero());
        assert_eq!(acc.calls(), 1);
        assert!(acc.total().is_zero());
        assert!(!acc.is_empty());
    }

    #[test]
    fn test_order_independence() {
        let calls = [
            UsageCounters::new(1, 2, 3, 4),
            UsageCounters::new(40, 30, 20, 10),
            UsageCounters::new(0, 9, 0, 0),
        ];

        let forward: UsageAccumulator = calls.iter().copied().collect();
        let backward: UsageAccumulator = calls.iter().rev().copied().collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_merge() {
        let mut a: UsageAccumulator = vec![UsageCounters::new(1, 1, 0, 0)].into_iter().collect();
        let b: UsageAccumulator = vec![
            UsageCounters::new(2, 2, 0, 0),
            UsageCounters::new(3, 3, 1, 1),
        ]
        .into_iter()
        .collect();

        a.merge(&b);
        assert_eq!(a.calls(), 3);
        assert_eq!(a.total(), UsageCounters::new(6, 6, 1, 1));
    }
}
