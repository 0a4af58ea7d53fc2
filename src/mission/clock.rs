//! clock.rs
//! Time source abstraction for the mission loop.
//!
//! The timed maneuvers (sweeps, bypass legs, the sprint) are all expressed
//! against this trait so the mission logic can run under test time instead
//! of wall time.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use spin_sleep::{SpinSleeper, SpinStrategy};

pub trait Clock: Send {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + Sync> Clock for std::sync::Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

pub struct SystemClock {
    start: Instant,
    sleeper: SpinSleeper,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            sleeper: SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}

/// Test clock: `sleep` advances time instantly.
pub struct MockClock {
    now: Mutex<Duration>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    pub fn new() -> Self {
        Self { now: Mutex::new(Duration::ZERO) }
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_advances_only_on_sleep() {
        let clock = MockClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
        clock.sleep(Duration::from_millis(250));
        clock.sleep(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(350));
    }
}
