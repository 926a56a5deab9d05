//! Sources: constant values and repeating profiles.

use ef_core::{CoreError, CoreResult, LoadType, OutputId, Tag, Unit};
use ef_graph::{GraphResult, OutputSpec, StepValues};
use ef_sim::{Component, ComponentResult, PortRegistrar};

/// Emits the same value every timestep on output `Value`.
#[derive(Debug, Clone)]
pub struct ConstantSource {
    name: String,
    pub value: f64,
    load_type: LoadType,
    unit: Unit,
    tags: Vec<Tag>,
    out: Option<OutputId>,
}

impl ConstantSource {
    pub const VALUE: &'static str = "Value";

    pub fn new(name: impl Into<String>, value: f64, load_type: LoadType, unit: Unit) -> Self {
        Self {
            name: name.into(),
            value,
            load_type,
            unit,
            tags: Vec::new(),
            out: None,
        }
    }

    /// A constant electrical power in watts.
    pub fn watts(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, LoadType::Electricity, Unit::Watt)
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

impl Component for ConstantSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.out = Some(ports.register_output_spec(
            OutputSpec::new(Self::VALUE, self.load_type, self.unit).with_tags(self.tags.clone()),
        )?);
        Ok(())
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        if let Some(out) = self.out {
            values.set_output(out, self.value);
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}

/// Emits `profile[t % len]` on output `Value`, e.g. an hourly PV yield that
/// repeats daily.
#[derive(Debug, Clone)]
pub struct ProfileSource {
    name: String,
    profile: Vec<f64>,
    load_type: LoadType,
    unit: Unit,
    tags: Vec<Tag>,
    out: Option<OutputId>,
}

impl ProfileSource {
    pub const VALUE: &'static str = "Value";

    pub fn new(
        name: impl Into<String>,
        profile: Vec<f64>,
        load_type: LoadType,
        unit: Unit,
    ) -> CoreResult<Self> {
        if profile.is_empty() {
            return Err(CoreError::InvalidArg {
                what: "profile must not be empty",
            });
        }
        if let Some(&bad) = profile.iter().find(|v| !v.is_finite()) {
            return Err(CoreError::NonFinite {
                what: "profile value",
                value: bad,
            });
        }
        Ok(Self {
            name: name.into(),
            profile,
            load_type,
            unit,
            tags: Vec::new(),
            out: None,
        })
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn value_at(&self, timestep: usize) -> f64 {
        self.profile[timestep % self.profile.len()]
    }
}

impl Component for ProfileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.out = Some(ports.register_output_spec(
            OutputSpec::new(Self::VALUE, self.load_type, self.unit).with_tags(self.tags.clone()),
        )?);
        Ok(())
    }

    fn simulate(&mut self, timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        if let Some(out) = self.out {
            values.set_output(out, self.value_at(timestep));
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}
