use core::ops::RangeInclusive;
use core::time::Duration;

/// Number of children produced for a parent on a cache miss.
pub const DEFAULT_CHILD_COUNT: RangeInclusive<usize> = 10..=20;

/// Upper bound of the simulated latency per generated child.
pub const DEFAULT_MAX_ITEM_DELAY: Duration = Duration::from_millis(500);

/// Tunables for [`FleetGenerator`](crate::FleetGenerator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    child_count: RangeInclusive<usize>,
    max_item_delay: Duration,
}

impl GeneratorConfig {
    /// Sets how many children a run produces.
    ///
    /// # Panics
    ///
    /// Panics if `range` is empty or starts at zero.
    #[must_use]
    pub fn with_child_count(mut self, range: RangeInclusive<usize>) -> Self {
        assert!(
            !range.is_empty() && *range.start() > 0,
            "child count range must be non-empty and start above zero"
        );
        self.child_count = range;
        self
    }

    /// Sets the upper bound of the per-item delay. `Duration::ZERO` disables
    /// the simulated latency.
    #[must_use]
    pub const fn with_max_item_delay(mut self, max: Duration) -> Self {
        self.max_item_delay = max;
        self
    }

    pub fn child_count(&self) -> RangeInclusive<usize> {
        self.child_count.clone()
    }

    pub const fn max_item_delay(&self) -> Duration {
        self.max_item_delay
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            child_count: DEFAULT_CHILD_COUNT,
            max_item_delay: DEFAULT_MAX_ITEM_DELAY,
        }
    }
}
