//! Frame clock.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Timer to synchronize the outer loop with the 60 Hz frame rate.
///
/// Time spent by the caller between waits counts towards the current
/// frame, so the interval is measured from the end of the previous wait.
pub struct Clock {
    interval: Duration,
    start: Instant,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            start: Instant::now(),
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Block the current thread until the next frame.
    pub fn wait(&mut self) {
        loop {
            let elapsed = self.start.elapsed();
            if elapsed < self.interval {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Spinning a loop causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the host was paused, and a large amount of time
                // has elapsed until it is resumed, it should simply
                // continue at the next frame running at its usual speed.
                self.reset();
                return;
            }
        }
    }
}

/// Frequency in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(1_000_000_000 / freq.0)
        }
    }
}
