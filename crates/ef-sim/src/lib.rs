//! ef-sim: discrete-timestep execution engine for component energy systems.
//!
//! Components implement [`Component`], are added to a [`Simulator`] and wired
//! by name, by class-based default connections, or by tagged dynamic ports.
//! Each timestep runs the schedule in passes until every output settles; the
//! final allowed pass is forced and any residual movement is recorded in the
//! [`RunReport`].
//!
//! ```
//! use ef_core::{LoadType, OutputId, Unit};
//! use ef_graph::{GraphResult, StepValues};
//! use ef_sim::{Component, ComponentResult, PortRegistrar, SimulationParameters, Simulator};
//!
//! struct Constant {
//!     out: Option<OutputId>,
//! }
//!
//! impl Component for Constant {
//!     fn name(&self) -> &str {
//!         "Constant"
//!     }
//!     fn register(&mut self, ports: &mut PortRegistrar<'_>) -> GraphResult<()> {
//!         self.out = Some(ports.register_output("Value", LoadType::Electricity, Unit::Watt)?);
//!         Ok(())
//!     }
//!     fn simulate(&mut self, _t: usize, v: &mut StepValues<'_>, _force: bool) -> ComponentResult<()> {
//!         if let Some(out) = self.out {
//!             v.set_output(out, 42.0);
//!         }
//!         Ok(())
//!     }
//!     fn save_state(&mut self) {}
//!     fn restore_state(&mut self) {}
//! }
//!
//! let params = SimulationParameters::one_day_only(2021, 3600).unwrap();
//! let mut sim = Simulator::with_parameters(params).unwrap();
//! sim.add_component(Constant { out: None }, false).unwrap();
//! let report = sim.run_all_timesteps().unwrap();
//! assert_eq!(report.timesteps, 24);
//! assert_eq!(sim.value("Constant", "Value"), Some(42.0));
//! ```

pub mod component;
pub(crate) mod engine;
pub mod error;
pub mod params;
pub mod progress;
pub mod report;
pub mod repository;
pub mod results;
pub mod schedule;
pub mod simulator;

pub use component::{Component, PortRegistrar, PrepareContext, Retained};
pub use error::{ComponentError, ComponentResult, SimError, SimResult};
pub use params::{ConvergenceOptions, PostProcessingOption, SimulationParameters};
pub use progress::{ProgressSnapshot, RunProgress};
pub use report::{ComponentTiming, NonConvergence, OutputResidual, RunReport};
pub use repository::{RepositoryError, RepositoryKey, RepositoryResult, SharedRepository};
pub use results::{ColumnInfo, ResultTable};
pub use schedule::{Schedule, Stage};
pub use simulator::{EngineState, Simulator, TimestepSummary};
