use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use spin_sleep::SpinSleeper;

// Driver idle time between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Monotonic time since an arbitrary fixed origin.
pub trait Monotonic {
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Monotonic for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Blocking delay backed by a spin sleeper.
#[derive(Default)]
pub struct SpinDelay {
    sleeper: SpinSleeper,
}

impl SpinDelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        // accounts for platform dependent sleep resolution
        self.sleeper.sleep(Duration::from_nanos(ns.into()));
    }
}

/// Paces the driver loop so polls happen at most once per interval.
pub struct PollTimer {
    pub interval: Duration,
    last_poll: Instant,
    sleeper: SpinSleeper,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: Instant::now(),
            sleeper: SpinSleeper::default(),
        }
    }

    pub fn mark_poll(&mut self) {
        self.last_poll = Instant::now();
    }

    pub fn try_sleep(&self) {
        let sleep_for = calc_next_timeout(&self.last_poll, self.interval);
        if !sleep_for.is_zero() {
            self.sleeper.sleep(sleep_for);
        }
    }
}

impl Default for PollTimer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[inline]
fn calc_next_timeout(last: &Instant, timeout: Duration) -> Duration {
    timeout.saturating_sub(last.elapsed())
}
