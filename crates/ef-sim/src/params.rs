//! Simulation parameters and their YAML/JSON loaders.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use ef_core::Tolerances;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SimError, SimResult};

/// Post-run processing a host may perform on the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PostProcessingOption {
    PlotLine,
    PlotCarpet,
    PlotSankey,
    ExportToCsv,
    ComputeKpis,
    GenerateResultSummary,
}

impl PostProcessingOption {
    pub const ALL: [PostProcessingOption; 6] = [
        PostProcessingOption::PlotLine,
        PostProcessingOption::PlotCarpet,
        PostProcessingOption::PlotSankey,
        PostProcessingOption::ExportToCsv,
        PostProcessingOption::ComputeKpis,
        PostProcessingOption::GenerateResultSummary,
    ];
}

/// Convergence settings for the per-timestep pass loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceOptions {
    /// Stability tolerance applied to every output.
    pub tolerance: Tolerances,
    /// Passes per timestep; the last one runs with `force_convergence`.
    pub max_passes: usize,
    /// Sub-iteration cap for an iteration group within one pass.
    pub group_max_iterations: usize,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            tolerance: Tolerances::default(),
            max_passes: 10,
            group_max_iterations: 50,
        }
    }
}

impl ConvergenceOptions {
    pub fn validate(&self) -> SimResult<()> {
        self.tolerance.validate()?;
        if self.max_passes == 0 {
            return Err(SimError::invalid_parameters("max_passes must be at least 1"));
        }
        if self.group_max_iterations == 0 {
            return Err(SimError::invalid_parameters(
                "group_max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_progress_interval() -> f64 {
    5.0
}

/// Immutable run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub seconds_per_timestep: u32,
    /// Overrides the count derived from the date range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timesteps: Option<usize>,
    #[serde(default)]
    pub post_processing_options: Vec<PostProcessingOption>,
    #[serde(default)]
    pub convergence: ConvergenceOptions,
    /// Minimum wall time between progress log lines (seconds).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_s: f64,
}

fn midnight(year: i32, month: u32, day: u32) -> SimResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SimError::invalid_parameters(format!("no such date {year}-{month}-{day}")))
}

impl SimulationParameters {
    pub fn new(
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
        seconds_per_timestep: u32,
    ) -> SimResult<Self> {
        let params = Self {
            start_date,
            end_date,
            seconds_per_timestep,
            timesteps: None,
            post_processing_options: Vec::new(),
            convergence: ConvergenceOptions::default(),
            progress_interval_s: default_progress_interval(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn full_year(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Self::new(
            midnight(year, 1, 1)?,
            midnight(year + 1, 1, 1)?,
            seconds_per_timestep,
        )
    }

    pub fn full_year_all_options(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        let mut p = Self::full_year(year, seconds_per_timestep)?;
        p.enable_all_options();
        Ok(p)
    }

    /// January 1st up to (not including) January 31st.
    pub fn january_only(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Self::new(
            midnight(year, 1, 1)?,
            midnight(year, 1, 31)?,
            seconds_per_timestep,
        )
    }

    pub fn three_months_only(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Self::new(
            midnight(year, 1, 1)?,
            midnight(year, 4, 1)?,
            seconds_per_timestep,
        )
    }

    pub fn one_week_only(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Self::new(
            midnight(year, 1, 1)?,
            midnight(year, 1, 8)?,
            seconds_per_timestep,
        )
    }

    pub fn one_day_only(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Self::new(
            midnight(year, 1, 1)?,
            midnight(year, 1, 2)?,
            seconds_per_timestep,
        )
    }

    /// Run exactly `n` timesteps regardless of the end date.
    pub fn with_timesteps(mut self, n: usize) -> Self {
        self.timesteps = Some(n);
        self
    }

    pub fn with_convergence(mut self, convergence: ConvergenceOptions) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.convergence.max_passes = max_passes;
        self
    }

    pub fn enable_all_options(&mut self) {
        for option in PostProcessingOption::ALL {
            if !self.post_processing_options.contains(&option) {
                self.post_processing_options.push(option);
            }
        }
    }

    pub fn is_enabled(&self, option: PostProcessingOption) -> bool {
        self.post_processing_options.contains(&option)
    }

    pub fn duration(&self) -> TimeDelta {
        self.end_date - self.start_date
    }

    /// Number of timesteps to simulate.
    pub fn timesteps(&self) -> usize {
        self.timesteps.unwrap_or_else(|| {
            let secs = self.duration().num_seconds().max(0) as u64;
            (secs / u64::from(self.seconds_per_timestep.max(1))) as usize
        })
    }

    /// Wall-clock start of timestep `index`.
    pub fn timestamp(&self, index: usize) -> NaiveDateTime {
        let offset = i64::from(self.seconds_per_timestep).saturating_mul(index as i64);
        self.start_date + TimeDelta::seconds(offset)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.seconds_per_timestep == 0 {
            return Err(SimError::invalid_parameters(
                "seconds_per_timestep must be positive",
            ));
        }
        if self.end_date <= self.start_date && self.timesteps.is_none() {
            return Err(SimError::invalid_parameters(format!(
                "end date {} is not after start date {}",
                self.end_date, self.start_date
            )));
        }
        if !(self.progress_interval_s.is_finite() && self.progress_interval_s >= 0.0) {
            return Err(SimError::invalid_parameters(
                "progress_interval_s must be a non-negative number",
            ));
        }
        self.convergence.validate()
    }

    /// SHA-256 over the canonical JSON form; equal parameters give equal keys.
    pub fn unique_key(&self) -> String {
        let mut hasher = Sha256::new();
        let json = serde_json::to_string(self).unwrap_or_default();
        hasher.update(json.as_bytes());
        hasher.update(self.timesteps().to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        let params: Self = serde_yaml::from_str(content)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_str(content: &str) -> SimResult<Self> {
        let params: Self = serde_json::from_str(content)?;
        params.validate()?;
        Ok(params)
    }
}

pub fn load_yaml(path: &Path) -> SimResult<SimulationParameters> {
    let content = std::fs::read_to_string(path)?;
    SimulationParameters::from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, params: &SimulationParameters) -> SimResult<()> {
    params.validate()?;
    let content = serde_yaml::to_string(params)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> SimResult<SimulationParameters> {
    let content = std::fs::read_to_string(path)?;
    SimulationParameters::from_json_str(&content)
}

pub fn save_json(path: &Path, params: &SimulationParameters) -> SimResult<()> {
    params.validate()?;
    let content = serde_json::to_string_pretty(params)?;
    std::fs::write(path, content)?;
    Ok(())
}
