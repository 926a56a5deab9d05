//! Wiring errors.
//!
//! Every variant is a configuration error: it is raised while the graph is
//! being assembled or frozen and is never retried.

use ef_core::{LoadType, Unit};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Component '{component}' is already part of the graph")]
    DuplicateComponent { component: String },

    #[error("Component '{component}' already has an output named '{output}'")]
    DuplicateOutput { component: String, output: String },

    #[error("Component '{component}' already has an input named '{input}'")]
    DuplicateInput { component: String, input: String },

    #[error("Unknown component '{component}'")]
    UnknownComponent { component: String },

    #[error("Component '{component}' has no input named '{input}'")]
    UnknownInput { component: String, input: String },

    #[error("Component '{component}' has no output named '{output}'")]
    UnknownOutput { component: String, output: String },

    #[error("Input '{component}.{input}' is already wired to '{source_name}'")]
    AlreadyConnected {
        component: String,
        input: String,
        source_name: String,
    },

    #[error(
        "Cannot wire '{source_name}' ({source_load}, {source_unit}) into '{component}.{input}' ({input_load}, {input_unit})"
    )]
    IncompatiblePorts {
        component: String,
        input: String,
        source_name: String,
        input_load: LoadType,
        input_unit: Unit,
        source_load: LoadType,
        source_unit: Unit,
    },

    #[error("Mandatory input '{component}.{input}' is not connected")]
    UnwiredMandatoryInput { component: String, input: String },

    #[error(
        "No component of class '{source_class}' provides output '{output}' for '{component}.{input}'"
    )]
    MissingDefaultSource {
        component: String,
        input: String,
        source_class: String,
        output: String,
    },

    #[error(
        "{candidates} components of class '{source_class}' provide output '{output}' for '{component}.{input}'"
    )]
    AmbiguousDefaultSource {
        component: String,
        input: String,
        source_class: String,
        output: String,
        candidates: usize,
    },

    #[error("Cannot {what} on component '{component}': the graph is frozen")]
    Frozen { component: String, what: &'static str },
}

impl GraphError {
    /// Name of the component the error is about.
    pub fn component(&self) -> &str {
        match self {
            GraphError::DuplicateComponent { component }
            | GraphError::DuplicateOutput { component, .. }
            | GraphError::DuplicateInput { component, .. }
            | GraphError::UnknownComponent { component }
            | GraphError::UnknownInput { component, .. }
            | GraphError::UnknownOutput { component, .. }
            | GraphError::AlreadyConnected { component, .. }
            | GraphError::IncompatiblePorts { component, .. }
            | GraphError::UnwiredMandatoryInput { component, .. }
            | GraphError::MissingDefaultSource { component, .. }
            | GraphError::AmbiguousDefaultSource { component, .. }
            | GraphError::Frozen { component, .. } => component,
        }
    }
}
