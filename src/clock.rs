//! # Clock Module
//!
//! Monotonic time source and blocking waits for the protocol and step timing.
//!
//! Both blocking points of the system go through [`Clock`]: the controller
//! link waits out its minimum poll spacing and the tick coordinator holds the
//! step pulse high. Times are expressed as a [`Duration`] since an arbitrary
//! fixed origin.

use spin_sleep::{SpinSleeper, SpinStrategy};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Native sleep accuracy assumed by the spin sleeper (100 µs)
const NATIVE_ACCURACY_NS: u32 = 100_000;

/// Monotonic clock with blocking waits
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Block the calling thread for `duration`
    fn delay(&mut self, duration: Duration);

    /// Block until `deadline` (measured from the clock's origin) has passed
    ///
    /// Returns immediately when the deadline is already behind us.
    fn wait_until(&mut self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            self.delay(deadline - now);
        }
    }
}

/// Wall clock backed by [`Instant`], sleeping with a spin sleeper for
/// sub-millisecond accuracy.
pub struct MonotonicClock {
    origin: Instant,
    sleeper: SpinSleeper,
}

impl std::fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl MonotonicClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            sleeper: SpinSleeper::new(NATIVE_ACCURACY_NS)
                .with_spin_strategy(SpinStrategy::YieldThread),
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

    fn delay(&mut self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}

/// Deterministic clock that only moves when told to.
///
/// `delay` advances time instantly instead of sleeping. Clones share the same
/// time, so a test can keep one handle while the link or coordinator owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    slept: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without counting it as a wait
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Total time spent inside `delay` so far
    pub fn total_slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn delay(&mut self, duration: Duration) {
        self.advance(duration);
        self.slept.set(self.slept.get() + duration);
    }
}
