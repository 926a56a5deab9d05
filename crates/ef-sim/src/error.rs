//! Error types for simulation operations.
//!
//! Two families are kept apart: configuration errors, which stop a run before
//! the first timestep, and domain errors raised by a component while it
//! simulates. `SimError::is_configuration` tells them apart.

use ef_core::CoreError;
use ef_graph::GraphError;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Errors a component reports from `prepare_simulation`, `simulate` or
/// `doublecheck`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Non-physical condition: {what}")]
    NonPhysical { what: String },

    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ComponentError {
    pub fn non_physical(what: impl Into<String>) -> Self {
        ComponentError::NonPhysical { what: what.into() }
    }

    pub fn invalid_input(what: impl Into<String>) -> Self {
        ComponentError::InvalidInput { what: what.into() }
    }
}

pub type ComponentResult<T> = Result<T, ComponentError>;

/// Errors surfaced to whoever drives the simulator.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] GraphError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Invalid simulation parameters: {what}")]
    InvalidParameters { what: String },

    #[error("Simulator not ready: {what}")]
    NotReady { what: &'static str },

    #[error("Component '{component}' failed to prepare: {source}")]
    Prepare {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("Component '{component}' failed at timestep {timestep}: {source}")]
    Domain {
        component: String,
        timestep: usize,
        #[source]
        source: ComponentError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// True for errors that indicate a broken setup rather than a component
    /// failing during a timestep. A missing repository entry counts as setup
    /// even when it is first noticed inside `simulate`.
    pub fn is_configuration(&self) -> bool {
        match self {
            SimError::Domain { source, .. } => matches!(source, ComponentError::Repository(_)),
            _ => true,
        }
    }

    pub fn invalid_parameters(what: impl Into<String>) -> Self {
        SimError::InvalidParameters { what: what.into() }
    }
}

impl From<CoreError> for SimError {
    fn from(e: CoreError) -> Self {
        SimError::InvalidParameters {
            what: e.to_string(),
        }
    }
}
