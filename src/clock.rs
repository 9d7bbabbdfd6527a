//! Timing sources
//!
//! Response latencies are differences between two reads of a monotonic clock.
//! The clock is injected so unit tests can script latencies exactly; a
//! missing monotonic clock is a fatal platform configuration problem, not a
//! recoverable error.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source. Readings are relative to an arbitrary epoch; only
/// differences between readings are meaningful.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Default clock backed by [`std::time::Instant`], anchored at construction
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Scriptable clock for tests and simulations. Clones share the same
/// underlying time, so a caller can keep a handle and advance the clock
/// after moving a clone into a collector.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.advance(Duration::from_millis(750));
        assert_eq!(clock.now(), Duration::from_millis(750));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(100));
    }
}
