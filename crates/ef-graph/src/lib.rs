//! ef-graph: wiring layer for energyflow.
//!
//! Provides:
//! - Port descriptors (inputs, outputs) and connection requests
//! - Incremental graph builder that resolves explicit, automatic and
//!   tag-based wiring, then freezes into an immutable `WiringGraph`
//! - Buffer layout and the per-timestep value buffer
//!
//! # Example
//!
//! ```
//! use ef_core::{LoadType, Unit};
//! use ef_graph::{GraphBuilder, InputSpec, OutputSpec};
//!
//! let mut builder = GraphBuilder::new();
//! let pv = builder.add_component("PV", "Photovoltaic").unwrap();
//! let meter = builder.add_component("Meter", "ElectricityMeter").unwrap();
//! builder
//!     .register_output(pv, OutputSpec::new("Power", LoadType::Electricity, Unit::Watt))
//!     .unwrap();
//! let input = builder
//!     .register_input(meter, InputSpec::mandatory("Production", LoadType::Electricity, Unit::Watt))
//!     .unwrap();
//! builder.connect(input, pv, "Power").unwrap();
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.output_count(), 1);
//! assert_eq!(graph.dependencies().len(), 1);
//! ```

pub mod buffer;
pub mod builder;
pub mod connection;
pub mod dynamic;
pub mod error;
pub mod graph;
pub mod indexing;
pub mod port;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use buffer::{Residual, StepValues, ValueBuffer};
pub use builder::GraphBuilder;
pub use connection::{Connection, ConnectionRequest};
pub use dynamic::{DynamicPort, DynamicPorts};
pub use error::{GraphError, GraphResult};
pub use graph::{ComponentNode, WiringGraph};
pub use indexing::BufferLayout;
pub use port::{Input, InputSpec, Output, OutputSpec};
