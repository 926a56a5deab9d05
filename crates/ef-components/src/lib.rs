//! ef-components: reference components for the ef-sim engine.
//!
//! Provides:
//! - Sources: constant values and repeating profiles
//! - A summing junction
//! - Controllers: proportional with clamp, sampled PI with anti-windup
//! - Storage: a decaying accumulator and a power-setpoint battery
//! - An electricity meter and a surplus-driven energy management system,
//!   both wired through tagged dynamic ports
//!
//! # Example
//!
//! ```
//! use ef_components::{ConstantSource, SumComponent};
//! use ef_core::{LoadType, Unit};
//! use ef_sim::{SimulationParameters, Simulator};
//!
//! let params = SimulationParameters::one_day_only(2021, 3600).unwrap();
//! let mut sim = Simulator::with_parameters(params).unwrap();
//! sim.add_component(ConstantSource::watts("Pv", 150.0), false).unwrap();
//! sim.add_component(ConstantSource::watts("Wind", 15.0), false).unwrap();
//! sim.add_component(
//!     SumComponent::new("Total", 2, LoadType::Electricity, Unit::Watt)
//!         .with_default(1, "ConstantSource", "Value"),
//!     false,
//! )
//! .unwrap();
//! let total = sim.component_id("Total").unwrap();
//! let pv = sim.component_id("Pv").unwrap();
//! let wind = sim.component_id("Wind").unwrap();
//! sim.connect(total, "Input1", pv, "Value").unwrap();
//! sim.connect(total, "Input2", wind, "Value").unwrap();
//! sim.run_all_timesteps().unwrap();
//! assert_eq!(sim.value("Total", "Sum"), Some(165.0));
//! ```

pub mod controller;
pub mod ems;
pub mod meter;
pub mod source;
pub mod storage;
pub mod sum;

pub use controller::{PiController, PiLaw, PiState, ProportionalController};
pub use ems::{DeviceRole, EnergyManagementSystem};
pub use meter::ElectricityMeter;
pub use source::{ConstantSource, ProfileSource};
pub use storage::{DecayingBattery, SimpleStorage, StorageConfig};
pub use sum::SumComponent;
