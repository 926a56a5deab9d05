//! The simulator: assembly, freeze and the timestep loop.
//!
//! ```text
//! Assembling --freeze--> Frozen --advance--> Running(t) --> Committed(t) --> ... --> Finished
//! ```
//!
//! Components are added and wired while assembling. `freeze` builds the
//! wiring graph, the buffer layout and the schedule, then calls
//! `prepare_simulation` on every component. After that the graph is
//! immutable and wiring calls fail with `GraphError::Frozen`.

use ef_core::timing::AccumulatingTimer;
use ef_core::{CompId, InputId, OutputId, Tag};
use ef_graph::{GraphBuilder, GraphError, InputSpec, OutputSpec, StepValues, ValueBuffer, WiringGraph};
use tracing::{debug, info, info_span, warn};

use crate::component::{Component, PortRegistrar, PrepareContext};
use crate::engine::{FrozenModel, StepOutcome, StepRunner};
use crate::error::{SimError, SimResult};
use crate::params::SimulationParameters;
use crate::progress::{ProgressSnapshot, RunProgress};
use crate::report::{ComponentTiming, NonConvergence, OutputResidual, RunReport};
use crate::repository::SharedRepository;
use crate::results::ResultTable;
use crate::schedule::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Assembling,
    Frozen,
    /// A timestep is being evaluated.
    Running { timestep: usize },
    /// The last completed timestep.
    Committed { timestep: usize },
    Finished,
}

/// Summary of one committed timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestepSummary {
    pub timestep: usize,
    pub passes: usize,
    pub converged: bool,
}

pub struct Simulator {
    state: EngineState,
    components: Vec<Box<dyn Component>>,
    /// Components whose registration failed; freeze refuses while any remain.
    failed_registrations: Vec<GraphError>,
    builder: GraphBuilder,
    model: Option<FrozenModel>,
    params: Option<SimulationParameters>,
    repository: SharedRepository,
    buffer: ValueBuffer,
    results: Option<ResultTable>,
    report: RunReport,
    timings: Vec<AccumulatingTimer>,
    progress: Option<RunProgress>,
    next_timestep: usize,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            state: EngineState::Assembling,
            components: Vec::new(),
            failed_registrations: Vec::new(),
            builder: GraphBuilder::new(),
            model: None,
            params: None,
            repository: SharedRepository::new(),
            buffer: ValueBuffer::new(0),
            results: None,
            report: RunReport::default(),
            timings: Vec::new(),
            progress: None,
            next_timestep: 0,
        }
    }

    /// Create a simulator with parameters already set.
    pub fn with_parameters(params: SimulationParameters) -> SimResult<Self> {
        let mut sim = Self::new();
        sim.set_simulation_parameters(params)?;
        Ok(sim)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state != EngineState::Assembling
    }

    /// Replace the run parameters. Allowed until the first timestep runs.
    pub fn set_simulation_parameters(&mut self, params: SimulationParameters) -> SimResult<()> {
        if !matches!(self.state, EngineState::Assembling | EngineState::Frozen) {
            return Err(SimError::NotReady {
                what: "parameters cannot change once the run has started",
            });
        }
        params.validate()?;
        debug!(key = %params.unique_key(), timesteps = params.timesteps(), "simulation parameters set");
        self.params = Some(params);
        Ok(())
    }

    pub fn parameters(&self) -> Option<&SimulationParameters> {
        self.params.as_ref()
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repository
    }

    /// Seed entries before the run; components read them in
    /// `prepare_simulation`.
    pub fn repository_mut(&mut self) -> &mut SharedRepository {
        &mut self.repository
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_id(&self, name: &str) -> Option<CompId> {
        match &self.model {
            Some(model) => model.graph.component_by_name(name).map(|c| c.id),
            None => self.builder.component_id(name),
        }
    }

    pub fn component(&self, id: CompId) -> Option<&dyn Component> {
        self.components.get(id.slot()).map(|c| c.as_ref())
    }

    fn ensure_assembling(&self, component: &str, what: &'static str) -> SimResult<()> {
        if self.is_frozen() {
            return Err(GraphError::Frozen {
                component: component.to_string(),
                what,
            }
            .into());
        }
        Ok(())
    }

    fn name_of(&self, id: CompId) -> String {
        self.builder
            .component(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("{id:?}"))
    }

    /// Add a component, register its ports and, if asked, resolve its
    /// default connections against components added earlier.
    pub fn add_component<C: Component + 'static>(
        &mut self,
        component: C,
        connect_automatically: bool,
    ) -> SimResult<CompId> {
        self.add_boxed_component(Box::new(component), connect_automatically)
    }

    pub fn add_boxed_component(
        &mut self,
        mut component: Box<dyn Component>,
        connect_automatically: bool,
    ) -> SimResult<CompId> {
        self.ensure_assembling(component.name(), "add a component")?;

        let id = self
            .builder
            .add_component(component.name(), component.class_name())?;
        let registered = {
            let mut ports = PortRegistrar::new(&mut self.builder, id);
            component.register(&mut ports)
        };
        let defaults = component.default_connections();
        debug!(
            component = component.name(),
            class = component.class_name(),
            defaults = defaults.len(),
            "component added"
        );
        // Ids are positional, so the component is kept even if registration
        // fails. Freeze reports the failure.
        self.components.push(component);
        let wired = registered.and_then(|()| self.builder.set_default_connections(id, defaults));
        if let Err(e) = wired {
            self.failed_registrations.push(e.clone());
            return Err(e.into());
        }

        if connect_automatically {
            let made = self.builder.connect_automatically(id)?;
            debug!(component = %self.name_of(id), connections = made, "automatic wiring");
        }
        Ok(id)
    }

    /// Wire `target.input` to `source.source_output`.
    pub fn connect(
        &mut self,
        target: CompId,
        input: &str,
        source: CompId,
        source_output: &str,
    ) -> SimResult<()> {
        self.ensure_assembling(&self.name_of(target), "connect an input")?;
        let input = self.builder.find_input(target, input)?;
        self.builder.connect(input, source, source_output)?;
        Ok(())
    }

    pub fn find_input(&self, component: CompId, name: &str) -> SimResult<InputId> {
        Ok(self.builder.find_input(component, name)?)
    }

    pub fn find_output(&self, component: CompId, name: &str) -> SimResult<OutputId> {
        Ok(self.builder.find_output(component, name)?)
    }

    pub fn connect_input(&mut self, input: InputId, output: OutputId) -> SimResult<()> {
        let owner = self
            .builder
            .input(input)
            .map(|i| self.name_of(i.comp))
            .unwrap_or_default();
        self.ensure_assembling(&owner, "connect an input")?;
        self.builder.connect_output(input, output)?;
        Ok(())
    }

    /// Apply `target`'s default connections for `source`'s class using that
    /// specific instance.
    pub fn connect_default_from(&mut self, target: CompId, source: CompId) -> SimResult<usize> {
        self.ensure_assembling(&self.name_of(target), "connect an input")?;
        Ok(self.builder.connect_defaults_from(target, source)?)
    }

    /// Re-run automatic wiring for a component added without it.
    pub fn connect_automatically(&mut self, target: CompId) -> SimResult<usize> {
        self.ensure_assembling(&self.name_of(target), "connect an input")?;
        Ok(self.builder.connect_automatically(target)?)
    }

    /// Add a tagged mandatory input to `target` and wire it to
    /// `source.source_output`. The input is named
    /// `Input_{source}_{output}_{n}` and takes the source's load type and
    /// unit.
    pub fn add_component_input_and_connect(
        &mut self,
        target: CompId,
        source: CompId,
        source_output: &str,
        tags: Vec<Tag>,
        weight: i32,
    ) -> SimResult<InputId> {
        self.ensure_assembling(&self.name_of(target), "add an input")?;
        let output = self.builder.find_output(source, source_output)?;
        self.add_tagged_input(target, output, tags, weight)
    }

    /// Add and wire one tagged input for every output of `sources` whose
    /// name contains `output_fragment`.
    pub fn add_component_inputs_and_connect(
        &mut self,
        target: CompId,
        sources: &[CompId],
        output_fragment: &str,
        tags: Vec<Tag>,
        weight: i32,
    ) -> SimResult<Vec<InputId>> {
        self.ensure_assembling(&self.name_of(target), "add an input")?;
        let mut matched = Vec::new();
        for &source in sources {
            let node = self
                .builder
                .component(source)
                .ok_or_else(|| GraphError::UnknownComponent {
                    component: format!("{source:?}"),
                })?;
            matched.extend(node.outputs.iter().copied().filter(|&o| {
                self.builder
                    .output(o)
                    .is_some_and(|out| out.name.contains(output_fragment))
            }));
        }
        matched
            .into_iter()
            .map(|output| self.add_tagged_input(target, output, tags.clone(), weight))
            .collect()
    }

    fn add_tagged_input(
        &mut self,
        target: CompId,
        output: OutputId,
        tags: Vec<Tag>,
        weight: i32,
    ) -> SimResult<InputId> {
        let out = self
            .builder
            .output(output)
            .ok_or_else(|| GraphError::UnknownOutput {
                component: self.name_of(target),
                output: format!("{output:?}"),
            })?;
        let (load_type, unit, output_name, source) =
            (out.load_type, out.unit, out.name.clone(), out.comp);
        let n = self.builder.dynamic_input_count(target)?;
        let name = format!("Input_{}_{}_{}", self.name_of(source), output_name, n);
        let spec = InputSpec::mandatory(name, load_type, unit);
        Ok(self
            .builder
            .add_dynamic_input(target, spec, tags, weight, output)?)
    }

    /// Add a tagged output to `target`. The output is named after the requested
    /// name followed by `Output{n}`, where `n` counts the component's outputs.
    pub fn add_component_output(&mut self, target: CompId, spec: OutputSpec) -> SimResult<OutputId> {
        self.ensure_assembling(&self.name_of(target), "add an output")?;
        let existing = self
            .builder
            .component(target)
            .map(|c| c.outputs.len())
            .ok_or_else(|| GraphError::UnknownComponent {
                component: format!("{target:?}"),
            })?;
        let spec = OutputSpec {
            name: format!("{}Output{}", spec.name, existing + 1),
            ..spec
        };
        Ok(self.builder.add_dynamic_output(target, spec)?)
    }

    /// Validate the graph, compute the schedule and prepare every component.
    /// Calling it again is a no-op.
    pub fn freeze(&mut self) -> SimResult<()> {
        if self.is_frozen() {
            return Ok(());
        }
        let _span = info_span!("freeze").entered();
        let params = self.params.clone().ok_or(SimError::NotReady {
            what: "simulation parameters must be set before freezing",
        })?;
        if self.components.is_empty() {
            return Err(SimError::NotReady {
                what: "no components have been added",
            });
        }
        if let Some(e) = self.failed_registrations.first() {
            warn!(
                failed = self.failed_registrations.len(),
                "refusing to freeze with half-registered components"
            );
            return Err(SimError::Config(e.clone()));
        }

        let graph = self.builder.clone().build()?;
        let model = FrozenModel::new(graph);

        for (index, component) in self.components.iter_mut().enumerate() {
            let mut ctx = PrepareContext::new(
                &model.graph,
                CompId::from_index(index as u32),
                &params,
                &mut self.repository,
            );
            component
                .prepare_simulation(&mut ctx)
                .map_err(|source| SimError::Prepare {
                    component: component.name().to_string(),
                    source,
                })?;
        }

        info!(
            components = model.graph.components().len(),
            outputs = model.graph.output_count(),
            connections = model.graph.connections().len(),
            stages = model.schedule.stages().len(),
            iteration_groups = model.schedule.group_count(),
            timesteps = params.timesteps(),
            "graph frozen"
        );

        self.buffer = ValueBuffer::new(model.layout.len());
        self.results = Some(ResultTable::new(&model.graph, &params));
        self.timings = vec![AccumulatingTimer::new(); self.components.len()];
        self.model = Some(model);
        self.state = EngineState::Frozen;
        Ok(())
    }

    pub fn graph(&self) -> Option<&WiringGraph> {
        self.model.as_ref().map(|m| &m.graph)
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.model.as_ref().map(|m| &m.schedule)
    }

    /// Run the next timestep. Freezes first if needed. Returns `None` once
    /// every timestep has been committed.
    pub fn advance(&mut self) -> SimResult<Option<TimestepSummary>> {
        self.freeze()?;
        let (Some(model), Some(params)) = (self.model.as_ref(), self.params.as_ref()) else {
            return Err(SimError::NotReady {
                what: "simulator is not frozen",
            });
        };
        let total = params.timesteps();
        let timestep = self.next_timestep;
        if timestep >= total {
            self.state = EngineState::Finished;
            return Ok(None);
        }

        let _span = info_span!("timestep", index = timestep).entered();
        self.state = EngineState::Running { timestep };
        let progress = self
            .progress
            .get_or_insert_with(|| RunProgress::new(total, params.progress_interval_s));

        let outcome = StepRunner {
            components: &mut self.components,
            model,
            options: &params.convergence,
            timings: &mut self.timings,
        }
        .run(timestep, &mut self.buffer)?;

        {
            let values = StepValues::new(&mut self.buffer, &model.layout);
            for component in &self.components {
                component
                    .doublecheck(timestep, &values)
                    .map_err(|source| SimError::Domain {
                        component: component.name().to_string(),
                        timestep,
                        source,
                    })?;
            }
        }

        let failure = (!outcome.converged).then(|| non_convergence(model, timestep, &outcome));
        if let Some(f) = &failure {
            warn!(
                timestep,
                passes = outcome.passes,
                residuals = f.residuals.len(),
                unsettled_groups = f.unsettled_groups.len(),
                "timestep committed without converging:\n{}",
                f.describe()
            );
        }
        if let Some(results) = self.results.as_mut() {
            results.push_row(params.timestamp(timestep), &self.buffer);
        }
        self.report.record(outcome.passes, failure);
        progress.tick(timestep + 1, self.report.average_passes());

        self.next_timestep += 1;
        self.state = if self.next_timestep >= total {
            EngineState::Finished
        } else {
            EngineState::Committed { timestep }
        };
        Ok(Some(TimestepSummary {
            timestep,
            passes: outcome.passes,
            converged: outcome.converged,
        }))
    }

    /// Run every remaining timestep and return the report. The shared
    /// repository is cleared when the run ends.
    pub fn run_all_timesteps(&mut self) -> SimResult<RunReport> {
        self.freeze()?;
        let total = self.params.as_ref().map(|p| p.timesteps()).unwrap_or(0);
        info!(timesteps = total, components = self.components.len(), "simulation started");

        let result = self.run_remaining();
        self.repository.clear();
        result?;

        self.report.wall_time_s = self.progress.as_ref().map_or(0.0, |p| p.elapsed_s());
        self.report.component_timings = self
            .components
            .iter()
            .zip(&self.timings)
            .map(|(c, t)| ComponentTiming {
                component: c.name().to_string(),
                calls: t.count(),
                total_s: t.total_seconds(),
            })
            .collect();
        self.state = EngineState::Finished;

        info!(
            timesteps = self.report.timesteps,
            wall_time_s = self.report.wall_time_s,
            average_passes = self.report.average_passes(),
            non_converged = self.report.non_converged.len(),
            "simulation finished"
        );
        Ok(self.report.clone())
    }

    fn run_remaining(&mut self) -> SimResult<()> {
        while self.advance()?.is_some() {}
        Ok(())
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn results(&self) -> Option<&ResultTable> {
        self.results.as_ref()
    }

    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.progress
            .as_ref()
            .map(|p| p.snapshot(self.report.timesteps, self.report.average_passes()))
    }

    /// Values committed by the last completed timestep.
    pub fn committed_values(&self) -> &ValueBuffer {
        &self.buffer
    }

    /// Last committed value of `component.output`.
    pub fn value(&self, component: &str, output: &str) -> Option<f64> {
        let model = self.model.as_ref()?;
        let comp = model.graph.component_by_name(component)?;
        let out = model.graph.output_by_name(comp.id, output)?;
        model
            .layout
            .index_of(out.id)
            .and_then(|i| self.buffer.get(i))
    }
}

fn non_convergence(model: &FrozenModel, timestep: usize, outcome: &StepOutcome) -> NonConvergence {
    let graph = &model.graph;
    let mut by_slot: Vec<Option<OutputId>> = vec![None; model.layout.len()];
    for out in graph.outputs() {
        if let Some(i) = model.layout.index_of(out.id) {
            by_slot[i] = Some(out.id);
        }
    }
    NonConvergence {
        timestep,
        passes: outcome.passes,
        residuals: outcome
            .residuals
            .iter()
            .map(|r| OutputResidual {
                output: by_slot
                    .get(r.index)
                    .copied()
                    .flatten()
                    .map(|o| graph.output_label(o))
                    .unwrap_or_else(|| format!("#{}", r.index)),
                before: r.before,
                after: r.after,
            })
            .collect(),
        unsettled_groups: outcome
            .unsettled_stages
            .iter()
            .filter_map(|&s| model.schedule.stages().get(s))
            .map(|stage| {
                stage
                    .members()
                    .iter()
                    .filter_map(|&m| graph.component(m).map(|c| c.name.clone()))
                    .collect()
            })
            .collect(),
    }
}
