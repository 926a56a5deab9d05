//! ef-core: stable foundation for energyflow.
//!
//! Contains:
//! - units (load types, units and dynamic-wiring tags)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for components and ports)
//! - timing (wall-clock helpers for progress reporting)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
