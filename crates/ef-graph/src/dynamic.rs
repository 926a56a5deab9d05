//! Tag-based registry of dynamically added ports.
//!
//! Aggregators (meters, energy-management controllers) do not know at compile
//! time how many producers or consumers they will serve. Ports added through
//! `add_dynamic_input`/`add_dynamic_output` are recorded here with their tags
//! and weight, and queried once at prepare time.

use ef_core::{InputId, OutputId, Tag, tags_superset};

/// One dynamically added port.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicPort<P> {
    pub port: P,
    pub tags: Vec<Tag>,
    pub weight: i32,
}

/// Per-component list of dynamic ports, in addition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicPorts {
    inputs: Vec<DynamicPort<InputId>>,
    outputs: Vec<DynamicPort<OutputId>>,
}

impl DynamicPorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_input(&mut self, port: InputId, tags: Vec<Tag>, weight: i32) {
        self.inputs.push(DynamicPort { port, tags, weight });
    }

    pub(crate) fn push_output(&mut self, port: OutputId, tags: Vec<Tag>, weight: i32) {
        self.outputs.push(DynamicPort { port, tags, weight });
    }

    pub fn inputs(&self) -> &[DynamicPort<InputId>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[DynamicPort<OutputId>] {
        &self.outputs
    }

    /// Every dynamic input whose tags are a superset of `tags`, in addition order.
    pub fn matching_inputs(&self, tags: &[Tag]) -> Vec<InputId> {
        self.inputs
            .iter()
            .filter(|p| tags_superset(&p.tags, tags))
            .map(|p| p.port)
            .collect()
    }

    /// Like `matching_inputs`, ordered by ascending weight. Ties keep addition
    /// order.
    pub fn matching_inputs_by_weight(&self, tags: &[Tag]) -> Vec<(InputId, i32)> {
        let mut found: Vec<(InputId, i32)> = self
            .inputs
            .iter()
            .filter(|p| tags_superset(&p.tags, tags))
            .map(|p| (p.port, p.weight))
            .collect();
        found.sort_by_key(|&(_, w)| w);
        found
    }

    /// Dynamic outputs carrying all of `tags` and exactly `weight`.
    pub fn matching_outputs(&self, tags: &[Tag], weight: i32) -> Vec<OutputId> {
        self.outputs
            .iter()
            .filter(|p| p.weight == weight && tags_superset(&p.tags, tags))
            .map(|p| p.port)
            .collect()
    }

    pub fn first_output(&self, tags: &[Tag], weight: i32) -> Option<OutputId> {
        self.outputs
            .iter()
            .find(|p| p.weight == weight && tags_superset(&p.tags, tags))
            .map(|p| p.port)
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}
