//! Adds up a fixed number of inputs.

use ef_core::{InputId, LoadType, OutputId, Unit};
use ef_graph::{ConnectionRequest, GraphResult, StepValues};
use ef_sim::{Component, ComponentResult, PortRegistrar};

/// `Sum = Input1 + ... + InputN`. Unwired inputs count as zero.
#[derive(Debug, Clone)]
pub struct SumComponent {
    name: String,
    arity: usize,
    load_type: LoadType,
    unit: Unit,
    defaults: Vec<ConnectionRequest>,
    inputs: Vec<InputId>,
    out: Option<OutputId>,
}

impl SumComponent {
    pub const SUM: &'static str = "Sum";

    pub fn new(name: impl Into<String>, arity: usize, load_type: LoadType, unit: Unit) -> Self {
        Self {
            name: name.into(),
            arity,
            load_type,
            unit,
            defaults: Vec::new(),
            inputs: Vec::new(),
            out: None,
        }
    }

    /// Name of the `index`-th input, starting at 1.
    pub fn input_name(index: usize) -> String {
        format!("Input{index}")
    }

    /// Wire `Input{index}` automatically to `output` of a `class` component.
    pub fn with_default(mut self, index: usize, class: &str, output: &str) -> Self {
        self.defaults
            .push(ConnectionRequest::new(Self::input_name(index), class, output));
        self
    }
}

impl Component for SumComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.inputs = (1..=self.arity)
            .map(|i| ports.register_input(Self::input_name(i), self.load_type, self.unit, false))
            .collect::<GraphResult<_>>()?;
        self.out = Some(ports.register_output(Self::SUM, self.load_type, self.unit)?);
        Ok(())
    }

    fn default_connections(&self) -> Vec<ConnectionRequest> {
        self.defaults.clone()
    }

    fn simulate(&mut self, _timestep: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let total = values.sum_inputs(&self.inputs);
        if let Some(out) = self.out {
            values.set_output(out, total);
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}
