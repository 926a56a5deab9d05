//! Storage components.

use ef_core::{CoreError, CoreResult, InputId, LoadType, OutputId, Unit};
use ef_graph::{GraphResult, StepValues};
use ef_sim::{Component, ComponentError, ComponentResult, PortRegistrar, PrepareContext, Retained};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `Level = decay * previous level + Charge`.
#[derive(Debug, Clone)]
pub struct DecayingBattery {
    name: String,
    pub decay: f64,
    level: Retained<f64>,
    charge: Option<InputId>,
    out: Option<OutputId>,
}

impl DecayingBattery {
    pub const CHARGE: &'static str = "Charge";
    pub const LEVEL: &'static str = "Level";

    pub fn new(name: impl Into<String>, decay: f64, initial_level: f64) -> Self {
        Self {
            name: name.into(),
            decay,
            level: Retained::new(initial_level),
            charge: None,
            out: None,
        }
    }

    pub fn level(&self) -> f64 {
        *self.level.current()
    }
}

impl Component for DecayingBattery {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.charge = Some(ports.register_input(Self::CHARGE, LoadType::Any, Unit::Any, true)?);
        self.out = Some(ports.register_output(Self::LEVEL, LoadType::Any, Unit::Any)?);
        Ok(())
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let charge = self.charge.map_or(0.0, |i| values.input(i));
        let level = self.decay * *self.level.saved() + charge;
        *self.level.current_mut() = level;
        if let Some(out) = self.out {
            values.set_output(out, level);
        }
        Ok(())
    }

    fn save_state(&mut self) {
        self.level.save();
    }

    fn restore_state(&mut self) {
        self.level.restore();
    }
}

fn default_efficiency() -> f64 {
    1.0
}

/// Electrical storage configuration. Powers in W, energies in Wh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub capacity_wh: f64,
    pub max_charge_w: f64,
    pub max_discharge_w: f64,
    #[serde(default)]
    pub initial_fill_wh: f64,
    #[serde(default = "default_efficiency")]
    pub charge_efficiency: f64,
    #[serde(default = "default_efficiency")]
    pub discharge_efficiency: f64,
    /// Fail instead of clipping when a request exceeds what the fill allows.
    #[serde(default)]
    pub strict_limits: bool,
}

impl StorageConfig {
    pub fn new(capacity_wh: f64, max_charge_w: f64, max_discharge_w: f64) -> Self {
        Self {
            capacity_wh,
            max_charge_w,
            max_discharge_w,
            initial_fill_wh: 0.0,
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
            strict_limits: false,
        }
    }

    pub fn with_initial_fill(mut self, fill_wh: f64) -> Self {
        self.initial_fill_wh = fill_wh;
        self
    }

    pub fn with_efficiencies(mut self, charge: f64, discharge: f64) -> Self {
        self.charge_efficiency = charge;
        self.discharge_efficiency = discharge;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_limits = true;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !(self.capacity_wh.is_finite() && self.capacity_wh > 0.0) {
            return Err(CoreError::InvalidArg {
                what: "capacity_wh must be positive",
            });
        }
        if !(self.max_charge_w >= 0.0 && self.max_discharge_w >= 0.0) {
            return Err(CoreError::InvalidArg {
                what: "power limits must be non-negative",
            });
        }
        if !(0.0..=self.capacity_wh).contains(&self.initial_fill_wh) {
            return Err(CoreError::InvalidArg {
                what: "initial_fill_wh must lie within the capacity",
            });
        }
        for eta in [self.charge_efficiency, self.discharge_efficiency] {
            if !(eta > 0.0 && eta <= 1.0) {
                return Err(CoreError::InvalidArg {
                    what: "efficiencies must be in (0, 1]",
                });
            }
        }
        Ok(())
    }
}

/// Power-setpoint battery with fill limits.
///
/// # Power convention
/// - `Target` and `ActualPower` positive: charging (a consumer on the bus)
/// - negative: discharging
///
/// Requests are clipped to the power limits and to what the fill allows.
/// With `strict_limits` a request the fill cannot serve is a non-physical
/// error, except under forced convergence where it is clipped.
#[derive(Debug, Clone)]
pub struct SimpleStorage {
    name: String,
    config: StorageConfig,
    dt_hours: f64,
    fill: Retained<f64>,
    target: Option<InputId>,
    actual: Option<OutputId>,
    fill_out: Option<OutputId>,
    soc_out: Option<OutputId>,
}

impl SimpleStorage {
    pub const TARGET: &'static str = "Target";
    pub const ACTUAL_POWER: &'static str = "ActualPower";
    pub const FILL: &'static str = "Fill";
    pub const STATE_OF_CHARGE: &'static str = "StateOfCharge";

    pub fn new(name: impl Into<String>, config: StorageConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            fill: Retained::new(config.initial_fill_wh),
            config,
            dt_hours: 1.0,
            target: None,
            actual: None,
            fill_out: None,
            soc_out: None,
        })
    }

    pub fn fill_wh(&self) -> f64 {
        *self.fill.current()
    }

    /// Clip `request_w` to limits and fill; returns (actual W, new fill Wh).
    fn dispatch(&self, fill: f64, request_w: f64, force: bool) -> ComponentResult<(f64, f64)> {
        let c = &self.config;
        let cmd = request_w.clamp(-c.max_discharge_w, c.max_charge_w);
        let (actual, next) = if cmd > 0.0 {
            let headroom_w = (c.capacity_wh - fill) / c.charge_efficiency / self.dt_hours;
            let actual = cmd.min(headroom_w.max(0.0));
            (actual, fill + actual * self.dt_hours * c.charge_efficiency)
        } else if cmd < 0.0 {
            let available_w = fill * c.discharge_efficiency / self.dt_hours;
            let actual = -(-cmd).min(available_w.max(0.0));
            (actual, fill + actual * self.dt_hours / c.discharge_efficiency)
        } else {
            (0.0, fill)
        };

        if c.strict_limits && !force && (actual - cmd).abs() > 1e-9 {
            return Err(ComponentError::non_physical(format!(
                "storage '{}' cannot serve {cmd:.1} W with {fill:.1} Wh of {:.1} Wh",
                self.name, c.capacity_wh
            )));
        }
        Ok((actual, next.clamp(0.0, c.capacity_wh)))
    }
}

impl Component for SimpleStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.target =
            Some(ports.register_input(Self::TARGET, LoadType::Electricity, Unit::Watt, true)?);
        self.actual =
            Some(ports.register_output(Self::ACTUAL_POWER, LoadType::Electricity, Unit::Watt)?);
        self.fill_out =
            Some(ports.register_output(Self::FILL, LoadType::Electricity, Unit::WattHour)?);
        self.soc_out =
            Some(ports.register_output(Self::STATE_OF_CHARGE, LoadType::Any, Unit::Percent)?);
        Ok(())
    }

    fn prepare_simulation(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.dt_hours = f64::from(ctx.params().seconds_per_timestep) / 3600.0;
        debug!(storage = %self.name, dt_hours = self.dt_hours, "storage prepared");
        Ok(())
    }

    fn simulate(&mut self, timestep: usize, values: &mut StepValues<'_>, force: bool) -> ComponentResult<()> {
        let request = self.target.map_or(0.0, |i| values.input(i));
        if !request.is_finite() {
            return Err(ComponentError::invalid_input(format!(
                "storage '{}' got a non-finite target at timestep {timestep}",
                self.name
            )));
        }
        let (actual, fill) = self.dispatch(*self.fill.saved(), request, force)?;
        *self.fill.current_mut() = fill;

        if let Some(o) = self.actual {
            values.set_output(o, actual);
        }
        if let Some(o) = self.fill_out {
            values.set_output(o, fill);
        }
        if let Some(o) = self.soc_out {
            values.set_output(o, 100.0 * fill / self.config.capacity_wh);
        }
        Ok(())
    }

    fn save_state(&mut self) {
        self.fill.save();
    }

    fn restore_state(&mut self) {
        self.fill.restore();
    }

    fn doublecheck(&self, _timestep: usize, values: &StepValues<'_>) -> ComponentResult<()> {
        let fill = self.fill_out.map_or(0.0, |o| values.output(o));
        if fill < 0.0 || fill > self.config.capacity_wh {
            return Err(ComponentError::non_physical(format!(
                "storage '{}' fill {fill} Wh outside 0..{} Wh",
                self.name, self.config.capacity_wh
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(config: StorageConfig) -> SimpleStorage {
        SimpleStorage::new("bat", config).unwrap()
    }

    #[test]
    fn charge_is_limited_by_power_and_headroom() {
        let s = storage(StorageConfig::new(1000.0, 500.0, 500.0).with_initial_fill(800.0));
        assert_eq!(s.dispatch(800.0, 300.0, false).unwrap(), (200.0, 1000.0));
        assert_eq!(s.dispatch(0.0, 900.0, false).unwrap(), (500.0, 500.0));
    }

    #[test]
    fn discharge_is_limited_by_fill() {
        let s = storage(StorageConfig::new(1000.0, 500.0, 500.0));
        assert_eq!(s.dispatch(100.0, -400.0, false).unwrap(), (-100.0, 0.0));
    }

    #[test]
    fn strict_storage_rejects_overdraw_unless_forced() {
        let s = storage(StorageConfig::new(1000.0, 500.0, 500.0).strict());
        let err = s.dispatch(100.0, -400.0, false).unwrap_err();
        assert!(matches!(err, ComponentError::NonPhysical { .. }));
        assert_eq!(s.dispatch(100.0, -400.0, true).unwrap(), (-100.0, 0.0));
    }

    #[test]
    fn efficiency_losses() {
        let s = storage(
            StorageConfig::new(1000.0, 1000.0, 1000.0)
                .with_initial_fill(500.0)
                .with_efficiencies(0.5, 0.5),
        );
        let (actual, fill) = s.dispatch(500.0, 100.0, false).unwrap();
        assert_eq!(actual, 100.0);
        assert_eq!(fill, 550.0);
        let (actual, fill) = s.dispatch(500.0, -100.0, false).unwrap();
        assert_eq!(actual, -100.0);
        assert_eq!(fill, 300.0);
    }

    #[test]
    fn config_validation() {
        assert!(StorageConfig::new(0.0, 1.0, 1.0).validate().is_err());
        assert!(StorageConfig::new(10.0, 1.0, 1.0).with_initial_fill(11.0).validate().is_err());
        assert!(StorageConfig::new(10.0, 1.0, 1.0).with_efficiencies(1.2, 1.0).validate().is_err());
        let cfg: StorageConfig =
            serde_yaml::from_str("capacity_wh: 10\nmax_charge_w: 1\nmax_discharge_w: 1\n").unwrap();
        assert_eq!(cfg.charge_efficiency, 1.0);
        assert!(!cfg.strict_limits);
    }
}
