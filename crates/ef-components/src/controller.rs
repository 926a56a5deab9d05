//! Controllers.
//!
//! - **Proportional**: `clamp(gain * measurement, min, max)`, stateless
//! - **PI**: sampled proportional-integral law with anti-windup; the integral
//!   is retained state and rolls back with the pass

use ef_core::{CoreError, CoreResult, InputId, LoadType, OutputId, Unit};
use ef_graph::{GraphResult, StepValues};
use ef_sim::{Component, ComponentResult, PortRegistrar, PrepareContext, Retained};
use serde::{Deserialize, Serialize};

/// Stateless proportional controller.
#[derive(Debug, Clone)]
pub struct ProportionalController {
    name: String,
    pub gain: f64,
    pub out_min: f64,
    pub out_max: f64,
    measurement: Option<InputId>,
    signal: Option<OutputId>,
}

impl ProportionalController {
    pub const MEASUREMENT: &'static str = "Measurement";
    pub const SIGNAL: &'static str = "Signal";

    pub fn new(name: impl Into<String>, gain: f64, out_min: f64, out_max: f64) -> CoreResult<Self> {
        if !(gain.is_finite() && out_min.is_finite() && out_max.is_finite()) {
            return Err(CoreError::InvalidArg {
                what: "controller parameters must be finite",
            });
        }
        if out_min > out_max {
            return Err(CoreError::InvalidArg {
                what: "out_min must not exceed out_max",
            });
        }
        Ok(Self {
            name: name.into(),
            gain,
            out_min,
            out_max,
            measurement: None,
            signal: None,
        })
    }

    pub fn output_for(&self, measurement: f64) -> f64 {
        (self.gain * measurement).clamp(self.out_min, self.out_max)
    }
}

impl Component for ProportionalController {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.measurement =
            Some(ports.register_input(Self::MEASUREMENT, LoadType::Any, Unit::Any, true)?);
        self.signal = Some(ports.register_output(Self::SIGNAL, LoadType::Any, Unit::Any)?);
        Ok(())
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let pv = self.measurement.map_or(0.0, |i| values.input(i));
        if let Some(out) = self.signal {
            values.set_output(out, self.output_for(pv));
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}

/// PI law configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiLaw {
    /// Proportional gain.
    pub kp: f64,
    /// Integral time constant (seconds). Larger values reduce integral action.
    pub ti: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Integral windup limit. If None, only the output clamp applies.
    #[serde(default)]
    pub integral_limit: Option<f64>,
}

impl PiLaw {
    pub fn new(kp: f64, ti: f64, out_min: f64, out_max: f64) -> CoreResult<Self> {
        if ti <= 0.0 {
            return Err(CoreError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if out_min >= out_max {
            return Err(CoreError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            ti,
            out_min,
            out_max,
            integral_limit: None,
        })
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// One sample of the law. Returns the updated state and the output.
    pub fn update(&self, state: &PiState, pv: f64, sp: f64, dt: f64) -> (PiState, f64) {
        // positive error: measurement below setpoint
        let error = sp - pv;
        let p_term = self.kp * error;

        let ki = self.kp / self.ti;
        let integral = state.integral + error * dt;
        let integral = match self.integral_limit {
            Some(limit) => integral.clamp(-limit, limit),
            None => integral,
        };

        let raw = p_term + ki * integral;
        let output = raw.clamp(self.out_min, self.out_max);

        // Saturated: hold the integral.
        let integral = if output == raw { integral } else { state.integral };
        (PiState { integral }, output)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PiState {
    pub integral: f64,
}

/// PI controller component.
///
/// Reads `Measurement` and an optional `Setpoint` input (falling back to the
/// configured setpoint when unwired) and writes `Signal`. The sample time is
/// the simulation timestep.
#[derive(Debug, Clone)]
pub struct PiController {
    name: String,
    law: PiLaw,
    pub setpoint: f64,
    dt: f64,
    state: Retained<PiState>,
    measurement: Option<InputId>,
    setpoint_in: Option<InputId>,
    signal: Option<OutputId>,
}

impl PiController {
    pub const MEASUREMENT: &'static str = "Measurement";
    pub const SETPOINT: &'static str = "Setpoint";
    pub const SIGNAL: &'static str = "Signal";

    pub fn new(name: impl Into<String>, law: PiLaw, setpoint: f64) -> Self {
        Self {
            name: name.into(),
            law,
            setpoint,
            dt: 0.0,
            state: Retained::new(PiState::default()),
            measurement: None,
            setpoint_in: None,
            signal: None,
        }
    }

    pub fn state(&self) -> &PiState {
        self.state.current()
    }
}

impl Component for PiController {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.measurement =
            Some(ports.register_input(Self::MEASUREMENT, LoadType::Any, Unit::Any, true)?);
        self.setpoint_in =
            Some(ports.register_input(Self::SETPOINT, LoadType::Any, Unit::Any, false)?);
        self.signal = Some(ports.register_output(Self::SIGNAL, LoadType::Any, Unit::Any)?);
        Ok(())
    }

    fn prepare_simulation(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.dt = f64::from(ctx.params().seconds_per_timestep);
        Ok(())
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let pv = self.measurement.map_or(0.0, |i| values.input(i));
        let sp = self
            .setpoint_in
            .and_then(|i| values.try_input(i))
            .unwrap_or(self.setpoint);
        let (next, output) = self.law.update(self.state.saved(), pv, sp, self.dt);
        *self.state.current_mut() = next;
        if let Some(out) = self.signal {
            values.set_output(out, output);
        }
        Ok(())
    }

    fn save_state(&mut self) {
        self.state.save();
    }

    fn restore_state(&mut self) {
        self.state.restore();
    }
}
