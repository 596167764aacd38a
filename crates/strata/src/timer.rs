//! Load time measurement.

use std::{
    cell::Cell,
    fmt,
    time::{Duration, Instant},
};

/// A timer that measures and averages the time an operation takes.
///
/// Collected timings are averaged and reset when the timer is displayed using `{}`
/// ([`std::fmt::Display`]).
///
/// Like the sequences that own them, timers are meant for use from a single thread.
pub struct Timer {
    name: &'static str,
    total: Cell<Duration>,
    count: Cell<u32>,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            total: Cell::new(Duration::ZERO),
            count: Cell::new(0),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the number of measurements recorded since the timer was last displayed.
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    fn stop(&self, start: Instant) {
        self.total.set(self.total.get() + start.elapsed());
        self.count.set(self.count.get() + 1);
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total.replace(Duration::ZERO);
        let count = self.count.replace(0);
        let avg_ms = if count == 0 {
            0.0
        } else {
            total.as_secs_f32() * 1000.0 / count as f32
        };

        write!(f, "{}: {count}x{avg_ms:.01}ms", self.name)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("count", &self.count.get())
            .finish()
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_resets() {
        let timer = Timer::new("load");
        assert_eq!(timer.time(|| 42), 42);
        drop(timer.start());
        assert_eq!(timer.count(), 2);

        let shown = timer.to_string();
        assert!(shown.starts_with("load: 2x"), "{shown}");
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.to_string(), "load: 0x0.0ms");
    }
}
