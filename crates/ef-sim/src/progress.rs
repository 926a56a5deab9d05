//! Periodic progress reporting for long runs.

use ef_core::timing::Timer;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Timesteps committed.
    pub step: usize,
    pub total: usize,
    pub elapsed_wall_s: f64,
    pub fraction_complete: f64,
    pub steps_per_s: f64,
    pub remaining_wall_s: f64,
    pub average_passes: f64,
}

/// Emits an `info!` line at most once per `interval_s` of wall time.
#[derive(Debug)]
pub struct RunProgress {
    timer: Timer,
    total: usize,
    interval_s: f64,
    last_report_s: f64,
}

impl RunProgress {
    pub fn new(total: usize, interval_s: f64) -> Self {
        Self {
            timer: Timer::start("simulation"),
            total,
            interval_s,
            last_report_s: 0.0,
        }
    }

    pub fn snapshot(&self, step: usize, average_passes: f64) -> ProgressSnapshot {
        let elapsed = self.timer.elapsed_s();
        let steps_per_s = if elapsed > 0.0 {
            step as f64 / elapsed
        } else {
            0.0
        };
        let remaining = self.total.saturating_sub(step);
        ProgressSnapshot {
            step,
            total: self.total,
            elapsed_wall_s: elapsed,
            fraction_complete: if self.total == 0 {
                1.0
            } else {
                step as f64 / self.total as f64
            },
            steps_per_s,
            remaining_wall_s: if steps_per_s > 0.0 {
                remaining as f64 / steps_per_s
            } else {
                0.0
            },
            average_passes,
        }
    }

    /// Log if the interval has elapsed. Returns the snapshot that was logged.
    pub fn tick(&mut self, step: usize, average_passes: f64) -> Option<ProgressSnapshot> {
        let now = self.timer.elapsed_s();
        if now - self.last_report_s < self.interval_s {
            return None;
        }
        self.last_report_s = now;
        let snap = self.snapshot(step, average_passes);
        info!(
            step = snap.step,
            total = snap.total,
            percent = %format!("{:.1}", snap.fraction_complete * 100.0),
            steps_per_s = %format!("{:.1}", snap.steps_per_s),
            remaining_s = %format!("{:.0}", snap.remaining_wall_s),
            average_passes = %format!("{:.2}", snap.average_passes),
            "simulation progress"
        );
        Some(snap)
    }

    pub fn elapsed_s(&self) -> f64 {
        self.timer.elapsed_s()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_logs_every_tick() {
        let mut p = RunProgress::new(10, 0.0);
        let snap = p.tick(5, 1.5).unwrap();
        assert_eq!(snap.step, 5);
        assert!((snap.fraction_complete - 0.5).abs() < 1e-12);
        assert!(p.tick(6, 1.5).is_some());
    }

    #[test]
    fn long_interval_suppresses_ticks() {
        let mut p = RunProgress::new(10, 3600.0);
        assert!(p.tick(1, 1.0).is_none());
    }

    #[test]
    fn empty_run_is_complete() {
        let p = RunProgress::new(0, 1.0);
        assert_eq!(p.snapshot(0, 0.0).fraction_complete, 1.0);
    }
}
