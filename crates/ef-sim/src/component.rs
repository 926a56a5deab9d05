//! The component contract.
//!
//! Every pluggable unit implements [`Component`]. A component registers its
//! ports once when it is added to the simulator, resolves any tag-based
//! lookups once in `prepare_simulation`, and from then on is driven through
//! `save_state` / `simulate` / `restore_state` by the engine.

use ef_core::{CompId, InputId, LoadType, OutputId, Tag, Unit};
use ef_graph::{
    ConnectionRequest, GraphBuilder, GraphResult, InputSpec, OutputSpec, StepValues, WiringGraph,
};

use crate::error::ComponentResult;
use crate::params::SimulationParameters;
use crate::repository::SharedRepository;

/// A named, stateful simulation unit.
pub trait Component {
    /// Instance name, unique within a simulator.
    fn name(&self) -> &str;

    /// Class name matched by other components' default connection requests.
    ///
    /// Defaults to the last path segment of the Rust type name.
    fn class_name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Declare inputs and outputs. Called once, from `add_component`.
    fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()>;

    /// "Wire my input X to output Y of a component of class C."
    fn default_connections(&self) -> Vec<ConnectionRequest> {
        Vec::new()
    }

    /// Called once after the graph is frozen, before the first timestep.
    fn prepare_simulation(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        Ok(())
    }

    /// Compute this timestep's outputs from the inputs in `values` and the
    /// retained state.
    ///
    /// Must depend only on retained state and current inputs. With
    /// `force_convergence` the component must produce a best-effort value
    /// instead of failing on inputs that have not settled.
    fn simulate(
        &mut self,
        timestep: usize,
        values: &mut StepValues<'_>,
        force_convergence: bool,
    ) -> ComponentResult<()>;

    /// Snapshot retained state at the start of a pass.
    fn save_state(&mut self);

    /// Roll retained state back to the last snapshot.
    fn restore_state(&mut self);

    /// Optional validation after a timestep has been committed.
    fn doublecheck(&self, _timestep: usize, _values: &StepValues<'_>) -> ComponentResult<()> {
        Ok(())
    }
}

/// Port registration handle given to [`Component::register`].
pub struct PortRegistrar<'a> {
    builder: &'a mut GraphBuilder,
    comp: CompId,
}

impl<'a> PortRegistrar<'a> {
    pub(crate) fn new(builder: &'a mut GraphBuilder, comp: CompId) -> Self {
        Self { builder, comp }
    }

    pub fn component(&self) -> CompId {
        self.comp
    }

    pub fn register_input(
        &mut self,
        name: impl Into<String>,
        load_type: LoadType,
        unit: Unit,
        mandatory: bool,
    ) -> GraphResult<InputId> {
        self.builder
            .register_input(self.comp, InputSpec::new(name, load_type, unit, mandatory))
    }

    pub fn register_output(
        &mut self,
        name: impl Into<String>,
        load_type: LoadType,
        unit: Unit,
    ) -> GraphResult<OutputId> {
        self.builder
            .register_output(self.comp, OutputSpec::new(name, load_type, unit))
    }

    /// Register an output carrying tags, a weight or a description.
    pub fn register_output_spec(&mut self, spec: OutputSpec) -> GraphResult<OutputId> {
        self.builder.register_output(self.comp, spec)
    }
}

/// What a component may look at while preparing.
pub struct PrepareContext<'a> {
    graph: &'a WiringGraph,
    comp: CompId,
    params: &'a SimulationParameters,
    repository: &'a mut SharedRepository,
}

impl<'a> PrepareContext<'a> {
    pub(crate) fn new(
        graph: &'a WiringGraph,
        comp: CompId,
        params: &'a SimulationParameters,
        repository: &'a mut SharedRepository,
    ) -> Self {
        Self {
            graph,
            comp,
            params,
            repository,
        }
    }

    pub fn component(&self) -> CompId {
        self.comp
    }

    pub fn graph(&self) -> &WiringGraph {
        self.graph
    }

    pub fn params(&self) -> &SimulationParameters {
        self.params
    }

    pub fn repository(&self) -> &SharedRepository {
        &*self.repository
    }

    pub fn repository_mut(&mut self) -> &mut SharedRepository {
        &mut *self.repository
    }

    /// Dynamic inputs whose tags include all of `tags`, in addition order.
    pub fn dynamic_inputs(&self, tags: &[Tag]) -> Vec<InputId> {
        self.graph.dynamic_inputs(self.comp, tags)
    }

    /// Dynamic inputs whose tags include all of `tags`, by ascending weight.
    pub fn dynamic_inputs_by_weight(&self, tags: &[Tag]) -> Vec<(InputId, i32)> {
        self.graph.dynamic_inputs_by_weight(self.comp, tags)
    }

    pub fn dynamic_outputs(&self, tags: &[Tag], weight: i32) -> Vec<OutputId> {
        self.graph.dynamic_outputs(self.comp, tags, weight)
    }

    pub fn first_dynamic_output(&self, tags: &[Tag], weight: i32) -> Option<OutputId> {
        self.graph.first_dynamic_output(self.comp, tags, weight)
    }

    pub fn input_named(&self, name: &str) -> Option<InputId> {
        self.graph.input_by_name(self.comp, name).map(|i| i.id)
    }

    pub fn output_named(&self, name: &str) -> Option<OutputId> {
        self.graph.output_by_name(self.comp, name).map(|o| o.id)
    }
}

/// Current retained state plus the snapshot taken by `save_state`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retained<S: Clone> {
    current: S,
    saved: S,
}

impl<S: Clone> Retained<S> {
    pub fn new(initial: S) -> Self {
        Self {
            saved: initial.clone(),
            current: initial,
        }
    }

    pub fn current(&self) -> &S {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut S {
        &mut self.current
    }

    /// State at the last snapshot, i.e. the previous committed timestep
    /// while a pass is running.
    pub fn saved(&self) -> &S {
        &self.saved
    }

    pub fn save(&mut self) {
        self.saved.clone_from(&self.current);
    }

    pub fn restore(&mut self) {
        self.current.clone_from(&self.saved);
    }
}
