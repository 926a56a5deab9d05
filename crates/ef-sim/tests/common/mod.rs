//! Small components shared by the engine tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ef_core::{InputId, LoadType, OutputId, Tag, Unit};
use ef_graph::{ConnectionRequest, GraphResult, OutputSpec, StepValues};
use ef_sim::{
    Component, ComponentError, ComponentResult, PortRegistrar, PrepareContext, Retained,
    SimulationParameters,
};

/// Route engine logs through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn hourly_params(timesteps: usize) -> SimulationParameters {
    SimulationParameters::one_day_only(2021, 3600)
        .expect("valid parameters")
        .with_timesteps(timesteps)
}

/// Event log shared between a test and its components.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(log: &Log, event: &str) -> usize {
    log.borrow().iter().filter(|e| e.as_str() == event).count()
}

/// Emits a fixed value on `Power`.
pub struct Source {
    pub name: String,
    pub value: f64,
    pub class: &'static str,
    pub tags: Vec<Tag>,
    pub out: Option<OutputId>,
    pub log: Option<Log>,
    /// Values emitted so far; only changes when a timestep commits.
    pub emitted: Retained<u64>,
}

impl Source {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            class: "Source",
            tags: Vec::new(),
            out: None,
            log: None,
            emitted: Retained::new(0),
        }
    }

    pub fn with_class(mut self, class: &'static str) -> Self {
        self.class = class;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_log(mut self, log: &Log) -> Self {
        self.log = Some(log.clone());
        self
    }

    fn note(&self, event: &str) {
        if let Some(log) = &self.log {
            log.borrow_mut().push(format!("{}:{}", self.name, event));
        }
    }
}

impl Component for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_name(&self) -> &str {
        self.class
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.out = Some(ports.register_output_spec(
            OutputSpec::new("Power", LoadType::Electricity, Unit::Watt).with_tags(self.tags.clone()),
        )?);
        Ok(())
    }

    fn simulate(&mut self, _t: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        self.note("simulate");
        let next = self.emitted.saved() + 1;
        *self.emitted.current_mut() = next;
        if let Some(out) = self.out {
            values.set_output(out, self.value);
        }
        Ok(())
    }

    fn save_state(&mut self) {
        self.note("save");
        self.emitted.save();
    }

    fn restore_state(&mut self) {
        self.note("restore");
        self.emitted.restore();
    }
}

/// `Total = A + B`, with default connections to the `Source` class.
pub struct Adder {
    pub name: String,
    pub a: Option<InputId>,
    pub b: Option<InputId>,
    pub out: Option<OutputId>,
    pub defaults: Vec<ConnectionRequest>,
}

impl Adder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            a: None,
            b: None,
            out: None,
            defaults: Vec::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<ConnectionRequest>) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Component for Adder {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.a = Some(ports.register_input("A", LoadType::Electricity, Unit::Watt, true)?);
        self.b = Some(ports.register_input("B", LoadType::Electricity, Unit::Watt, false)?);
        self.out = Some(ports.register_output("Total", LoadType::Electricity, Unit::Watt)?);
        Ok(())
    }

    fn default_connections(&self) -> Vec<ConnectionRequest> {
        self.defaults.clone()
    }

    fn simulate(&mut self, _t: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let total = self.a.map_or(0.0, |i| values.input(i)) + self.b.map_or(0.0, |i| values.input(i));
        if let Some(out) = self.out {
            values.set_output(out, total);
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}

/// `Out = clamp(gain * In, min, max)`.
pub struct Gain {
    pub name: String,
    pub gain: f64,
    pub min: f64,
    pub max: f64,
    pub input: Option<InputId>,
    pub out: Option<OutputId>,
}

impl Gain {
    pub fn new(name: &str, gain: f64) -> Self {
        Self {
            name: name.to_string(),
            gain,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            input: None,
            out: None,
        }
    }

    pub fn clamped(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

impl Component for Gain {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.input = Some(ports.register_input("In", LoadType::Electricity, Unit::Watt, true)?);
        self.out = Some(ports.register_output("Out", LoadType::Electricity, Unit::Watt)?);
        Ok(())
    }

    fn simulate(&mut self, _t: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let x = self.input.map_or(0.0, |i| values.input(i));
        if let Some(out) = self.out {
            values.set_output(out, (self.gain * x).clamp(self.min, self.max));
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}

/// `Out = 0.9 * previous + In`. The retained state is shared with the test.
pub struct Leaky {
    pub name: String,
    pub input: Option<InputId>,
    pub out: Option<OutputId>,
    pub state: Rc<RefCell<Retained<f64>>>,
}

impl Leaky {
    pub fn new(name: &str, initial: f64) -> Self {
        Self {
            name: name.to_string(),
            input: None,
            out: None,
            state: Rc::new(RefCell::new(Retained::new(initial))),
        }
    }
}

impl Component for Leaky {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.input = Some(ports.register_input("In", LoadType::Electricity, Unit::Watt, true)?);
        self.out = Some(ports.register_output("Out", LoadType::Electricity, Unit::Watt)?);
        Ok(())
    }

    fn simulate(&mut self, _t: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        let x = self.input.map_or(0.0, |i| values.input(i));
        let mut state = self.state.borrow_mut();
        let out = 0.9 * *state.saved() + x;
        *state.current_mut() = out;
        if let Some(o) = self.out {
            values.set_output(o, out);
        }
        Ok(())
    }

    fn save_state(&mut self) {
        self.state.borrow_mut().save();
    }

    fn restore_state(&mut self) {
        self.state.borrow_mut().restore();
    }
}

/// Fails with a non-physical error from timestep `fail_at` on.
pub struct FailsAt {
    pub fail_at: usize,
    pub out: Option<OutputId>,
}

impl Component for FailsAt {
    fn name(&self) -> &str {
        "Fragile"
    }

    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        self.out = Some(ports.register_output("Out", LoadType::Any, Unit::Any)?);
        Ok(())
    }

    fn simulate(&mut self, t: usize, values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        if t >= self.fail_at {
            return Err(ComponentError::non_physical("storage charge went negative"));
        }
        if let Some(o) = self.out {
            values.set_output(o, t as f64);
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}

/// Reads a repository entry either while preparing or while simulating.
pub struct NeedsEntry {
    pub key: ef_sim::RepositoryKey,
    pub in_prepare: bool,
    pub value: f64,
}

impl Component for NeedsEntry {
    fn name(&self) -> &str {
        "Consumer"
    }

    fn register(&mut self, _ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
        Ok(())
    }

    fn prepare_simulation(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        if self.in_prepare {
            self.value = *ctx.repository().get::<f64>(&self.key)?;
        }
        Ok(())
    }

    fn simulate(&mut self, _t: usize, _values: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
        if !self.in_prepare {
            return Err(ef_sim::RepositoryError::Missing {
                key: self.key.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn save_state(&mut self) {}
    fn restore_state(&mut self) {}
}
