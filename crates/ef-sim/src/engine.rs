//! One timestep of the multi-pass evaluation.
//!
//! A pass snapshots every component, walks the schedule, and sub-iterates
//! iteration groups until their outputs settle. The pass is accepted when all
//! groups settled and, from the second pass on, every output is within
//! tolerance of its value at the start of the pass. A rejected pass restores
//! every component and the next one starts from the values the rejected pass
//! left in the buffer. The final allowed pass runs with `force_convergence`
//! and is committed whatever it produces.

use ef_core::timing::AccumulatingTimer;
use ef_core::{CompId, Tolerances, nearly_equal};
use ef_graph::{BufferLayout, Residual, StepValues, ValueBuffer, WiringGraph};
use tracing::{debug, trace};

use crate::component::Component;
use crate::error::{SimError, SimResult};
use crate::params::ConvergenceOptions;
use crate::schedule::{Schedule, Stage};

/// Everything fixed at freeze time.
#[derive(Debug, Clone)]
pub(crate) struct FrozenModel {
    pub graph: WiringGraph,
    pub layout: BufferLayout,
    pub schedule: Schedule,
    /// Buffer slots written by each stage's members, indexed like the stages.
    pub stage_slots: Vec<Vec<usize>>,
}

impl FrozenModel {
    pub fn new(graph: WiringGraph) -> Self {
        let layout = BufferLayout::from_graph(&graph);
        let schedule = Schedule::from_graph(&graph);
        let stage_slots = schedule
            .stages()
            .iter()
            .map(|stage| {
                stage
                    .members()
                    .iter()
                    .flat_map(|&m| graph.outputs_of(m))
                    .filter_map(|o| layout.index_of(o.id))
                    .collect()
            })
            .collect();
        Self {
            graph,
            layout,
            schedule,
            stage_slots,
        }
    }
}

/// How a timestep ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepOutcome {
    pub passes: usize,
    pub converged: bool,
    /// Outputs that moved during the final pass, only set when not converged.
    pub residuals: Vec<Residual>,
    /// Stage indices of groups that hit their sub-iteration cap in the final
    /// pass.
    pub unsettled_stages: Vec<usize>,
}

pub(crate) struct StepRunner<'a> {
    pub components: &'a mut [Box<dyn Component>],
    pub model: &'a FrozenModel,
    pub options: &'a ConvergenceOptions,
    pub timings: &'a mut [AccumulatingTimer],
}

impl StepRunner<'_> {
    /// Run `timestep` against `buffer`, which holds the previous committed
    /// values on entry and the committed values on success.
    pub fn run(&mut self, timestep: usize, buffer: &mut ValueBuffer) -> SimResult<StepOutcome> {
        let model = self.model;
        let tol = self.options.tolerance;
        let max_passes = self.options.max_passes.max(1);
        let mut pass_start = buffer.clone();
        let mut pass = 0;

        loop {
            pass += 1;
            let force = pass >= max_passes;
            trace!(timestep, pass, force, "pass start");

            for component in self.components.iter_mut() {
                component.save_state();
            }
            pass_start.copy_from(buffer);

            let mut unsettled = Vec::new();
            for (index, stage) in model.schedule.stages().iter().enumerate() {
                match stage {
                    Stage::Single(comp) => self.simulate(*comp, timestep, buffer, force)?,
                    Stage::IterationGroup(members) => {
                        let slots = &model.stage_slots[index];
                        if !self.iterate_group(members, slots, timestep, buffer, force, tol)? {
                            unsettled.push(index);
                        }
                    }
                }
            }

            let stable = pass == 1 || buffer.is_close_to(&pass_start, tol);
            if unsettled.is_empty() && stable {
                trace!(timestep, pass, "pass accepted");
                return Ok(StepOutcome {
                    passes: pass,
                    converged: true,
                    residuals: Vec::new(),
                    unsettled_stages: Vec::new(),
                });
            }

            if force {
                return Ok(StepOutcome {
                    passes: pass,
                    converged: false,
                    residuals: buffer.residuals(&pass_start, tol),
                    unsettled_stages: unsettled,
                });
            }

            debug!(
                timestep,
                pass,
                unsettled_groups = unsettled.len(),
                "pass rejected, restoring state"
            );
            for component in self.components.iter_mut() {
                component.restore_state();
            }
        }
    }

    /// Gauss-Seidel sweeps over a group until its outputs stop moving.
    /// Returns whether the group settled within the iteration cap.
    fn iterate_group(
        &mut self,
        members: &[CompId],
        slots: &[usize],
        timestep: usize,
        buffer: &mut ValueBuffer,
        force: bool,
        tol: Tolerances,
    ) -> SimResult<bool> {
        let read = |buffer: &ValueBuffer| -> Vec<f64> {
            slots
                .iter()
                .map(|&i| buffer.get(i).unwrap_or(0.0))
                .collect()
        };
        let mut before = read(buffer);
        let cap = self.options.group_max_iterations.max(1);

        for iteration in 1..=cap {
            if iteration > 1 {
                for &m in members {
                    self.components[m.slot()].restore_state();
                }
            }
            for &m in members {
                self.simulate(m, timestep, buffer, force)?;
            }
            let after = read(buffer);
            let settled = after
                .iter()
                .zip(&before)
                .all(|(&a, &b)| nearly_equal(a, b, tol));
            trace!(timestep, iteration, settled, "group sweep");
            if settled {
                return Ok(true);
            }
            before = after;
        }

        debug!(timestep, cap, members = members.len(), "iteration group did not settle");
        Ok(false)
    }

    fn simulate(
        &mut self,
        comp: CompId,
        timestep: usize,
        buffer: &mut ValueBuffer,
        force: bool,
    ) -> SimResult<()> {
        let slot = comp.slot();
        let component = &mut self.components[slot];
        let mut values = StepValues::new(buffer, &self.model.layout);
        self.timings[slot]
            .measure(|| component.simulate(timestep, &mut values, force))
            .map_err(|source| SimError::Domain {
                component: component.name().to_string(),
                timestep,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{PortRegistrar, Retained};
    use crate::error::ComponentResult;
    use ef_core::{InputId, LoadType, OutputId, Unit};
    use ef_graph::{GraphBuilder, GraphResult};

    /// out = state + gain * in; state accumulates the output.
    struct Accumulator {
        gain: f64,
        input: Option<InputId>,
        output: Option<OutputId>,
        state: Retained<f64>,
    }

    impl Accumulator {
        fn new(gain: f64, initial: f64) -> Self {
            Self {
                gain,
                input: None,
                output: None,
                state: Retained::new(initial),
            }
        }
    }

    impl Component for Accumulator {
        fn name(&self) -> &str {
            "acc"
        }
        fn register(&mut self, _ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
            Ok(())
        }
        fn simulate(
            &mut self,
            _timestep: usize,
            values: &mut StepValues<'_>,
            _force: bool,
        ) -> ComponentResult<()> {
            let input = self.input.map(|i| values.input(i)).unwrap_or(0.0);
            let out = *self.state.saved() + self.gain * input;
            *self.state.current_mut() = out;
            if let Some(o) = self.output {
                values.set_output(o, out);
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

    fn looped(gain: f64) -> (Vec<Box<dyn Component>>, FrozenModel) {
        let mut b = GraphBuilder::new();
        let a = b.add_component("A", "Accumulator").unwrap();
        let c = b.add_component("B", "Accumulator").unwrap();
        let mut comps = vec![Accumulator::new(gain, 10.0), Accumulator::new(gain, 0.0)];
        for (i, comp) in [a, c].into_iter().enumerate() {
            comps[i].input = Some(
                b.register_input(
                    comp,
                    ef_graph::InputSpec::optional("In", LoadType::Any, Unit::Any),
                )
                .unwrap(),
            );
            comps[i].output = Some(
                b.register_output(comp, ef_graph::OutputSpec::new("Out", LoadType::Any, Unit::Any))
                    .unwrap(),
            );
        }
        b.connect(comps[0].input.unwrap(), c, "Out").unwrap();
        b.connect(comps[1].input.unwrap(), a, "Out").unwrap();
        let model = FrozenModel::new(b.build().unwrap());
        let boxed = comps
            .into_iter()
            .map(|c| Box::new(c) as Box<dyn Component>)
            .collect();
        (boxed, model)
    }

    #[test]
    fn contracting_loop_settles_in_one_pass() {
        let (mut comps, model) = looped(0.5);
        let options = ConvergenceOptions::default();
        let mut timings = vec![AccumulatingTimer::new(); comps.len()];
        let mut buffer = ValueBuffer::new(model.layout.len());
        let mut runner = StepRunner {
            components: &mut comps,
            model: &model,
            options: &options,
            timings: &mut timings,
        };
        let outcome = runner.run(0, &mut buffer).unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.passes, 1);
        // a = 10 + 0.5 b, b = 0.5 a  =>  a = 40/3
        let a = buffer.get(0).unwrap();
        assert!((a - 40.0 / 3.0).abs() < 1e-3, "a = {a}");
    }

    #[test]
    fn diverging_loop_is_forced_on_last_pass() {
        let (mut comps, model) = looped(2.0);
        let options = ConvergenceOptions {
            max_passes: 3,
            group_max_iterations: 4,
            ..ConvergenceOptions::default()
        };
        let mut timings = vec![AccumulatingTimer::new(); comps.len()];
        let mut buffer = ValueBuffer::new(model.layout.len());
        let mut runner = StepRunner {
            components: &mut comps,
            model: &model,
            options: &options,
            timings: &mut timings,
        };
        let outcome = runner.run(0, &mut buffer).unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.passes, 3);
        assert_eq!(outcome.unsettled_stages, vec![0]);
        assert!(!outcome.residuals.is_empty());
        assert!(timings.iter().all(|t| t.count() == 3 * 4));
    }
}
