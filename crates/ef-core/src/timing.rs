//! Lightweight wall-clock timing.
//!
//! Used by the engine to report run duration, per-component evaluation time
//! and progress speed.

use std::time::{Duration, Instant};

/// A simple timer that measures elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed wall time in seconds, timer keeps running.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Accumulating timer for tracking total time across multiple calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatingTimer {
    total_s: f64,
    count: u64,
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_s: 0.0,
            count: 0,
        }
    }

    /// Record a timing measurement.
    pub fn record(&mut self, duration_s: f64) {
        self.total_s += duration_s;
        self.count += 1;
    }

    /// Time `f` and record it.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(start.elapsed().as_secs_f64());
        out
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_s
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        if self.count > 0 {
            self.total_s / self.count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_counts_calls() {
        let mut t = AccumulatingTimer::new();
        t.record(0.5);
        t.record(1.5);
        assert_eq!(t.count(), 2);
        assert!((t.average_seconds() - 1.0).abs() < 1e-12);

        let v = t.measure(|| 3);
        assert_eq!(v, 3);
        assert_eq!(t.count(), 3);

        t.reset();
        assert_eq!(t.count(), 0);
        assert_eq!(t.average_seconds(), 0.0);
    }

    #[test]
    fn timer_is_monotonic() {
        let t = Timer::start("test");
        let a = t.elapsed_s();
        let b = t.elapsed_s();
        assert!(b >= a);
        assert_eq!(t.label(), "test");
    }
}
