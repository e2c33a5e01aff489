//! # Usage Monitor
//!
//! Resource accounting for completion calls. Every call made while servicing
//! a request reports a [`UsageCounters`] value; the orchestrator folds them
//! into a [`UsageAccumulator`] so the request total is exact regardless of
//! which branch (synthesis or trainer escalation) the request took.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`UsageCounters`] | Four token counters, a commutative monoid under `+` |
//! | [`UsageSummary`] | Serializable counters with the derived `total_tokens` |
//! | [`UsageAccumulator`] | Per-request running total plus call count |
//!
//! ## Quick Start
//!
//! ```rust
//! use soul_monitor::{UsageAccumulator, UsageCounters};
//!
//! let mut usage = UsageAccumulator::new();
//! usage.record(UsageCounters::new(120, 40, 0, 0));
//! usage.record(UsageCounters::new(300, 90, 64, 0));
//!
//! assert_eq!(usage.calls(), 2);
//! assert_eq!(usage.total().total_tokens(), 550);
//! ```

mod accumulator;
mod usage;

pub use accumulator::UsageAccumulator;
pub use usage::{UsageCounters, UsageSummary};
