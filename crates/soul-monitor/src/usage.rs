//! Token usage counters.
//!
//! [`UsageCounters`] forms a commutative monoid: addition is associative and
//! commutative, and [`UsageCounters::zero`] is the identity. Addition
//! saturates instead of wrapping so a corrupt provider report can never turn
//! a large total into a small one.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Token counters reported by a single completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageCounters {
    /// New (uncached) input tokens.
    #[serde(default)]
    pub input_tokens: u64,
    /// Generated output tokens.
    #[serde(default)]
    pub output_tokens: u64,
    /// Input tokens served from the prompt cache.
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    /// Input tokens written to the prompt cache.
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

impl UsageCounters {
    /// Creates counters from the four raw values.
    #[must_use]
    pub const fn new(
        input_tokens: u64,
        output_tokens: u64,
        cache_read_input_tokens: u64,
        cache_creation_input_tokens: u64,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_read_input_tokens,
            cache_creation_input_tokens,
        }
    }

    /// The identity element.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Returns true if every counter is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.cache_read_input_tokens == 0
            && self.cache_creation_input_tokens == 0
    }

    /// Input plus output tokens. Cache counters are not included.
    #[inline]
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Serializable view with the derived total.
    #[must_use]
    pub const fn summary(&self) -> UsageSummary {
        UsageSummary {
            counters: *self,
            total_tokens: self.total_tokens(),
        }
    }
}

impl Add for UsageCounters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
            cache_read_input_tokens: self
                .cache_read_input_tokens
                .saturating_add(rhs.cache_read_input_tokens),
            cache_creation_input_tokens: self
                .cache_creation_input_tokens
                .saturating_add(rhs.cache_creation_input_tokens),
        }
    }
}

impl AddAssign for UsageCounters {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for UsageCounters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<'a> Sum<&'a UsageCounters> for UsageCounters {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Usage counters as reported to callers, with `total_tokens` derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(flatten)]
    pub counters: UsageCounters,
    pub total_tokens: u64,
}

impl From<UsageCounters> for UsageSummary {
    fn from(counters: UsageCounters) -> Self {
        counters.summary()
    }
}
