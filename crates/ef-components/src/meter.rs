//! Electricity meter: a dynamic aggregator over tagged inputs.

use ef_core::{CompId, InputId, LoadType, OutputId, Tag, Unit};
use ef_graph::{GraphResult, StepValues};
use ef_sim::{
    Component, ComponentResult, PortRegistrar, PrepareContext, Retained, SimResult, Simulator,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MeterTotals {
    production_wh: f64,
    consumption_wh: f64,
    from_grid_wh: f64,
    to_grid_wh: f64,
}

/// Sums every dynamic input tagged `ElectricityProduction` against every
/// input tagged `ElectricityConsumptionUncontrolled` or
/// `ElectricityConsumptionControlled`, and keeps cumulative energies.
///
/// Inputs are resolved once in `prepare_simulation`; anything wired through
/// [`ElectricityMeter::add_producer`] / [`ElectricityMeter::add_consumer`] is
/// picked up without the meter knowing its sources.
#[derive(Debug, Clone)]
pub struct ElectricityMeter {
    name: String,
    dt_hours: f64,
    production: Vec<InputId>,
    consumption: Vec<InputId>,
    totals: Retained<MeterTotals>,
    balance: Option<OutputId>,
    to_grid: Option<OutputId>,
    from_grid: Option<OutputId>,
    cumulative_production: Option<OutputId>,
    cumulative_consumption: Option<OutputId>,
    cumulative_from_grid: Option<OutputId>,
    cumulative_to_grid: Option<OutputId>,
}

impl ElectricityMeter {
    pub const BALANCE: &'static str = "ElectricityToOrFromGrid";
    pub const TO_GRID: &'static str = "ElectricityToGrid";
    pub const FROM_GRID: &'static str = "ElectricityFromGrid";
    pub const CUMULATIVE_PRODUCTION: &'static str = "CumulativeProduction";
    pub const CUMULATIVE_CONSUMPTION: &'static str = "CumulativeConsumption";
    pub const CUMULATIVE_FROM_GRID: &'static str = "CumulativeFromGrid";
    pub const CUMULATIVE_TO_GRID: &'static str = "CumulativeToGrid";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dt_hours: 1.0,
            production: Vec::new(),
            consumption: Vec::new(),
            totals: Retained::new(MeterTotals::default()),
            balance: None,
            to_grid: None,
            from_grid: None,
            cumulative_production: None,
            cumulative_consumption: None,
            cumulative_from_grid: None,
            cumulative_to_grid: None,
        }
    }

    /// Wire `source.output` into `meter` as production.
    pub fn add_producer(
        sim: &mut Simulator,
        meter: CompId,
        source: CompId,
        output: &str,
    ) -> SimResult<InputId> {
        sim.add_component_input_and_connect(meter, source, output, vec![Tag::ElectricityProduction], 0)
    }

    /// Wire `source.output` into `meter` as consumption. `controlled` picks
    /// the tag used by energy management.
    pub fn add_consumer(
        sim: &mut Simulator,
        meter: CompId,
        source: CompId,
        output: &str,
        controlled: bool,
    ) -> SimResult<InputId> {
        let tag = if controlled {
            Tag::ElectricityConsumptionControlled
        } else {
            Tag::ElectricityConsumptionUncontrolled
        };
        sim.add_component_input_and_connect(meter, source, output, vec![tag], 0)
    }
}

impl Component for ElectricityMeter {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        let (el, w, wh) = (LoadType::Electricity, Unit::Watt, Unit::WattHour);
        self.balance = Some(ports.register_output(Self::BALANCE, el, w)?);
        self.to_grid = Some(ports.register_output(Self::TO_GRID, el, w)?);
        self.from_grid = Some(ports.register_output(Self::FROM_GRID, el, w)?);
        self.cumulative_production = Some(ports.register_output(Self::CUMULATIVE_PRODUCTION, el, wh)?);
        self.cumulative_consumption =
            Some(ports.register_output(Self::CUMULATIVE_CONSUMPTION, el, wh)?);
        self.cumulative_from_grid = Some(ports.register_output(Self::CUMULATIVE_FROM_GRID, el, wh)?);
        self.cumulative_to_grid = Some(ports.register_output(Self::CUMULATIVE_TO_GRID, el, wh)?);
        Ok(())
    }

    fn prepare_simulation(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.dt_hours = f64::from(ctx.params().seconds_per_timestep) / 3600.0;
        self.production = ctx.dynamic_inputs(&[Tag::ElectricityProduction]);
        self.consumption = ctx.dynamic_inputs(&[Tag::ElectricityConsumptionUncontrolled]);
        self.consumption
            .extend(ctx.dynamic_inputs(&[Tag::ElectricityConsumptionControlled]));
        debug!(
            meter = %self.name,
            producers = self.production.len(),
            consumers = self.consumption.len(),
            "meter inputs resolved"
        );
        Ok(())
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let production = values.sum_inputs(&self.production);
        let consumption = values.sum_inputs(&self.consumption);
        let balance = production - consumption;
        let to_grid = balance.max(0.0);
        let from_grid = (-balance).max(0.0);

        let prev = *self.totals.saved();
        let totals = MeterTotals {
            production_wh: prev.production_wh + production * self.dt_hours,
            consumption_wh: prev.consumption_wh + consumption * self.dt_hours,
            from_grid_wh: prev.from_grid_wh + from_grid * self.dt_hours,
            to_grid_wh: prev.to_grid_wh + to_grid * self.dt_hours,
        };
        *self.totals.current_mut() = totals;

        for (port, value) in [
            (self.balance, balance),
            (self.to_grid, to_grid),
            (self.from_grid, from_grid),
            (self.cumulative_production, totals.production_wh),
            (self.cumulative_consumption, totals.consumption_wh),
            (self.cumulative_from_grid, totals.from_grid_wh),
            (self.cumulative_to_grid, totals.to_grid_wh),
        ] {
            if let Some(o) = port {
                values.set_output(o, value);
            }
        }
        Ok(())
    }

    fn save_state(&mut self) {
        self.totals.save();
    }

    fn restore_state(&mut self) {
        self.totals.restore();
    }
}
