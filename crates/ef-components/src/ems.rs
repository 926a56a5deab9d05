//! Surplus-driven energy management.
//!
//! The EMS sees production and uncontrolled consumption through tagged
//! dynamic inputs, and talks to each controlled device through a pair of
//! dynamic ports sharing one weight: an output tagged
//! `[device, ElectricityTarget]` carrying the surplus offered to the device,
//! and an input tagged `[device, ElectricityReal]` carrying what the device
//! actually drew. Devices are served in ascending weight; a flexible
//! consumer reduces the surplus offered to the next one, storage does not.
//!
//! The target/real pair forms a cycle with every device, so the EMS and its
//! devices always end up in one iteration group.

use ef_core::{CompId, InputId, LoadType, OutputId, Tag, Unit};
use ef_graph::{GraphResult, OutputSpec, StepValues};
use ef_sim::{
    Component, ComponentError, ComponentResult, PortRegistrar, PrepareContext, SimResult,
    Simulator,
};
use tracing::debug;

/// How a controlled device uses the surplus it is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// Takes a signed target: charges on surplus, discharges on deficit.
    /// Does not reduce the surplus offered to later devices.
    Storage,
    /// Consumes what it is offered when there is surplus; its real draw is
    /// subtracted before the next device is served.
    Flexible,
}

impl DeviceRole {
    pub fn for_tag(tag: Tag) -> Self {
        match tag {
            Tag::Battery | Tag::Buffer => DeviceRole::Storage,
            _ => DeviceRole::Flexible,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ControlledDevice {
    role: DeviceRole,
    real: InputId,
    target: OutputId,
}

#[derive(Debug, Clone)]
pub struct EnergyManagementSystem {
    name: String,
    production: Vec<InputId>,
    uncontrolled: Vec<InputId>,
    devices: Vec<ControlledDevice>,
    grid: Option<OutputId>,
    flexible: Option<OutputId>,
    total_consumption: Option<OutputId>,
}

impl EnergyManagementSystem {
    pub const ELECTRICITY_TO_OR_FROM_GRID: &'static str = "ElectricityToOrFromGrid";
    pub const FLEXIBLE_ELECTRICITY: &'static str = "FlexibleElectricity";
    pub const TOTAL_CONSUMPTION: &'static str = "TotalElectricityConsumption";
    /// Prefix of the per-device target outputs.
    pub const TARGET_PREFIX: &'static str = "ElectricityTarget";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            production: Vec::new(),
            uncontrolled: Vec::new(),
            devices: Vec::new(),
            grid: None,
            flexible: None,
            total_consumption: None,
        }
    }

    pub fn add_producer(
        sim: &mut Simulator,
        ems: CompId,
        source: CompId,
        output: &str,
    ) -> SimResult<InputId> {
        sim.add_component_input_and_connect(ems, source, output, vec![Tag::ElectricityProduction], 0)
    }

    pub fn add_uncontrolled_consumer(
        sim: &mut Simulator,
        ems: CompId,
        source: CompId,
        output: &str,
    ) -> SimResult<InputId> {
        sim.add_component_input_and_connect(
            ems,
            source,
            output,
            vec![Tag::ElectricityConsumptionUncontrolled],
            0,
        )
    }

    /// Put `device` under control: `device.target_input` receives the
    /// surplus offered at `weight`, and `device.real_output` reports back.
    /// `kind` is the device class tag (`Battery`, `HeatPump`, ...).
    pub fn add_controlled_device(
        sim: &mut Simulator,
        ems: CompId,
        device: CompId,
        kind: Tag,
        target_input: &str,
        real_output: &str,
        weight: i32,
    ) -> SimResult<()> {
        let target = sim.add_component_output(
            ems,
            OutputSpec::new(Self::TARGET_PREFIX, LoadType::Electricity, Unit::Watt)
                .with_tags([kind, Tag::ElectricityTarget])
                .with_weight(weight),
        )?;
        let input = sim.find_input(device, target_input)?;
        sim.connect_input(input, target)?;
        sim.add_component_input_and_connect(
            ems,
            device,
            real_output,
            vec![kind, Tag::ElectricityReal, Tag::ElectricityConsumptionControlled],
            weight,
        )?;
        Ok(())
    }

    /// Offer `surplus` to each device in weight order. `real` holds each
    /// device's last reported draw. Returns the targets.
    fn distribute(&self, mut surplus: f64, real: &[f64]) -> Vec<f64> {
        self.devices
            .iter()
            .zip(real)
            .map(|(device, &drawn)| {
                let target = surplus;
                if device.role == DeviceRole::Flexible && surplus > 0.0 {
                    surplus -= drawn;
                }
                target
            })
            .collect()
    }
}

impl Component for EnergyManagementSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        let (el, w) = (LoadType::Electricity, Unit::Watt);
        self.grid = Some(ports.register_output(Self::ELECTRICITY_TO_OR_FROM_GRID, el, w)?);
        self.flexible = Some(ports.register_output(Self::FLEXIBLE_ELECTRICITY, el, w)?);
        self.total_consumption = Some(ports.register_output(Self::TOTAL_CONSUMPTION, el, w)?);
        Ok(())
    }

    fn prepare_simulation(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.production = ctx.dynamic_inputs(&[Tag::ElectricityProduction]);
        self.uncontrolled = ctx.dynamic_inputs(&[Tag::ElectricityConsumptionUncontrolled]);

        let mut devices = Vec::new();
        for (real, weight) in ctx.dynamic_inputs_by_weight(&[Tag::ElectricityReal]) {
            let kind = ctx
                .graph()
                .input(real)
                .and_then(|i| i.tags.first().copied())
                .ok_or_else(|| {
                    ComponentError::invalid_input(format!("{real:?} carries no device tag"))
                })?;
            let target = ctx
                .first_dynamic_output(&[kind, Tag::ElectricityTarget], weight)
                .ok_or_else(|| {
                    ComponentError::invalid_input(format!(
                        "EMS '{}' has no {kind} target output with weight {weight}",
                        self.name
                    ))
                })?;
            devices.push(ControlledDevice {
                role: DeviceRole::for_tag(kind),
                real,
                target,
            });
        }
        debug!(
            ems = %self.name,
            producers = self.production.len(),
            uncontrolled = self.uncontrolled.len(),
            devices = devices.len(),
            "energy management resolved"
        );
        self.devices = devices;
        Ok(())
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let production = values.sum_inputs(&self.production);
        let uncontrolled = values.sum_inputs(&self.uncontrolled);
        let real: Vec<f64> = self.devices.iter().map(|d| values.input(d.real)).collect();
        let controlled: f64 = real.iter().sum();

        let flexible = production - uncontrolled;
        for (device, target) in self.devices.iter().zip(self.distribute(flexible, &real)) {
            values.set_output(device.target, target);
        }

        if let Some(o) = self.grid {
            values.set_output(o, flexible - controlled);
        }
        if let Some(o) = self.flexible {
            values.set_output(o, flexible);
        }
        if let Some(o) = self.total_consumption {
            values.set_output(o, uncontrolled + controlled);
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}
