//! Frozen wiring graph.

use std::collections::{BTreeSet, HashMap};

use ef_core::{CompId, InputId, OutputId, Tag};

use crate::connection::{Connection, ConnectionRequest};
use crate::dynamic::DynamicPorts;
use crate::port::{Input, Output};

/// A component as seen by the wiring layer: identity, class and port lists.
///
/// The component's behaviour lives elsewhere; the graph only knows what it
/// exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    pub id: CompId,
    pub name: String,
    /// Class name used by automatic wiring.
    pub class: String,
    /// Inputs in registration order.
    pub inputs: Vec<InputId>,
    /// Outputs in registration order.
    pub outputs: Vec<OutputId>,
    pub dynamic: DynamicPorts,
    pub default_connections: Vec<ConnectionRequest>,
}

/// The graph: a validated, immutable set of components, ports and connections.
///
/// Output `global_index` values are assigned and form exactly
/// `0..outputs().len()`.
#[derive(Debug, Clone)]
pub struct WiringGraph {
    pub(crate) components: Vec<ComponentNode>,
    pub(crate) inputs: Vec<Input>,
    pub(crate) outputs: Vec<Output>,
    pub(crate) by_name: HashMap<String, CompId>,
    pub(crate) connections: Vec<Connection>,
}

impl WiringGraph {
    pub fn components(&self) -> &[ComponentNode] {
        &self.components
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Resolved connections in input registration order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn component(&self, id: CompId) -> Option<&ComponentNode> {
        self.components.get(id.slot())
    }

    pub fn component_by_name(&self, name: &str) -> Option<&ComponentNode> {
        self.by_name.get(name).and_then(|&id| self.component(id))
    }

    pub fn input(&self, id: InputId) -> Option<&Input> {
        self.inputs.get(id.slot())
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id.slot())
    }

    pub fn inputs_of(&self, comp: CompId) -> impl Iterator<Item = &Input> + '_ {
        self.component(comp)
            .into_iter()
            .flat_map(|c| c.inputs.iter())
            .filter_map(|&id| self.input(id))
    }

    pub fn outputs_of(&self, comp: CompId) -> impl Iterator<Item = &Output> + '_ {
        self.component(comp)
            .into_iter()
            .flat_map(|c| c.outputs.iter())
            .filter_map(|&id| self.output(id))
    }

    pub fn input_by_name(&self, comp: CompId, name: &str) -> Option<&Input> {
        self.inputs_of(comp).find(|i| i.name == name)
    }

    pub fn output_by_name(&self, comp: CompId, name: &str) -> Option<&Output> {
        self.outputs_of(comp).find(|o| o.name == name)
    }

    /// `Component.Output` label for logs and error messages.
    pub fn output_label(&self, id: OutputId) -> String {
        match self.output(id) {
            Some(out) => {
                let comp = self.component(out.comp).map_or("?", |c| c.name.as_str());
                format!("{comp}.{}", out.name)
            }
            None => format!("{id:?}"),
        }
    }

    /// Component-level dependency edges `(producer, consumer)`, deduplicated
    /// and sorted. A component reading its own output yields a self edge.
    pub fn dependencies(&self) -> Vec<(CompId, CompId)> {
        let mut edges = BTreeSet::new();
        for conn in &self.connections {
            let (Some(out), Some(inp)) = (self.output(conn.source), self.input(conn.target))
            else {
                continue;
            };
            edges.insert((out.comp, inp.comp));
        }
        edges.into_iter().collect()
    }

    /// Dynamic inputs of `comp` whose tags are a superset of `tags`, in the
    /// order they were added.
    pub fn dynamic_inputs(&self, comp: CompId, tags: &[Tag]) -> Vec<InputId> {
        self.component(comp)
            .map(|c| c.dynamic.matching_inputs(tags))
            .unwrap_or_default()
    }

    /// Like `dynamic_inputs`, sorted by ascending weight.
    pub fn dynamic_inputs_by_weight(&self, comp: CompId, tags: &[Tag]) -> Vec<(InputId, i32)> {
        self.component(comp)
            .map(|c| c.dynamic.matching_inputs_by_weight(tags))
            .unwrap_or_default()
    }

    pub fn dynamic_outputs(&self, comp: CompId, tags: &[Tag], weight: i32) -> Vec<OutputId> {
        self.component(comp)
            .map(|c| c.dynamic.matching_outputs(tags, weight))
            .unwrap_or_default()
    }

    pub fn first_dynamic_output(&self, comp: CompId, tags: &[Tag], weight: i32) -> Option<OutputId> {
        self.component(comp)
            .and_then(|c| c.dynamic.first_output(tags, weight))
    }
}
