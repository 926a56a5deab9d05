//! Run-level convergence report.

use serde::Serialize;

/// An output that was still moving when a timestep was force-committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputResidual {
    /// `Component.Output`
    pub output: String,
    pub before: f64,
    pub after: f64,
}

/// A timestep committed through the forced final pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonConvergence {
    pub timestep: usize,
    pub passes: usize,
    /// Outputs that differed from the start of the final pass.
    pub residuals: Vec<OutputResidual>,
    /// Iteration groups (component names) that hit their sub-iteration cap.
    pub unsettled_groups: Vec<Vec<String>>,
}

impl NonConvergence {
    /// One line per residual, largest first, for log and error messages.
    pub fn describe(&self) -> String {
        let mut residuals = self.residuals.clone();
        residuals.sort_by(|a, b| {
            let da = (a.after - a.before).abs();
            let db = (b.after - b.before).abs();
            db.total_cmp(&da)
        });
        let mut lines: Vec<String> = residuals
            .iter()
            .map(|r| format!("{}: {} -> {}", r.output, r.before, r.after))
            .collect();
        for group in &self.unsettled_groups {
            lines.push(format!("unsettled group [{}]", group.join(", ")));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentTiming {
    pub component: String,
    pub calls: u64,
    pub total_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Timesteps committed so far.
    pub timesteps: usize,
    pub passes_per_timestep: Vec<usize>,
    pub non_converged: Vec<NonConvergence>,
    pub wall_time_s: f64,
    pub component_timings: Vec<ComponentTiming>,
}

impl RunReport {
    pub(crate) fn record(&mut self, passes: usize, failure: Option<NonConvergence>) {
        self.timesteps += 1;
        self.passes_per_timestep.push(passes);
        if let Some(f) = failure {
            self.non_converged.push(f);
        }
    }

    /// True when no timestep needed the forced final pass to commit.
    pub fn converged(&self) -> bool {
        self.non_converged.is_empty()
    }

    pub fn total_passes(&self) -> usize {
        self.passes_per_timestep.iter().sum()
    }

    pub fn max_passes_used(&self) -> usize {
        self.passes_per_timestep.iter().copied().max().unwrap_or(0)
    }

    pub fn average_passes(&self) -> f64 {
        if self.timesteps == 0 {
            0.0
        } else {
            self.total_passes() as f64 / self.timesteps as f64
        }
    }

    pub fn non_converged_timesteps(&self) -> Vec<usize> {
        self.non_converged.iter().map(|n| n.timestep).collect()
    }
}
