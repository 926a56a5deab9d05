//! Incremental graph builder and connection resolver.

use std::collections::HashMap;

use ef_core::{CompId, InputId, OutputId, Tag};
use tracing::debug;

use crate::connection::{self, Connection, ConnectionRequest};
use crate::dynamic::DynamicPorts;
use crate::error::{GraphError, GraphResult};
use crate::graph::{ComponentNode, WiringGraph};
use crate::port::{Input, InputSpec, Output, OutputSpec};
use crate::validate;

/// Builder for constructing a wiring graph incrementally.
///
/// Add components, register their ports and wire them, then call `build()`
/// to validate and freeze everything into an immutable `WiringGraph`.
/// Components, inputs and outputs get ids in registration order.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    components: Vec<ComponentNode>,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    by_name: HashMap<String, CompId>,
}

impl GraphBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Names must be unique across the graph.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> GraphResult<CompId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateComponent { component: name });
        }
        let id = CompId::from_index(self.components.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.components.push(ComponentNode {
            id,
            name,
            class: class.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            dynamic: DynamicPorts::new(),
            default_connections: Vec::new(),
        });
        Ok(id)
    }

    pub fn component(&self, id: CompId) -> Option<&ComponentNode> {
        self.components.get(id.slot())
    }

    pub fn component_id(&self, name: &str) -> Option<CompId> {
        self.by_name.get(name).copied()
    }

    pub fn components(&self) -> &[ComponentNode] {
        &self.components
    }

    pub fn input(&self, id: InputId) -> Option<&Input> {
        self.inputs.get(id.slot())
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id.slot())
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn node(&self, comp: CompId) -> GraphResult<&ComponentNode> {
        self.components
            .get(comp.slot())
            .ok_or_else(|| GraphError::UnknownComponent {
                component: format!("{comp:?}"),
            })
    }

    fn node_mut(&mut self, comp: CompId) -> GraphResult<&mut ComponentNode> {
        self.components
            .get_mut(comp.slot())
            .ok_or_else(|| GraphError::UnknownComponent {
                component: format!("{comp:?}"),
            })
    }

    pub fn register_input(&mut self, comp: CompId, spec: InputSpec) -> GraphResult<InputId> {
        self.push_input(comp, spec, Vec::new(), 0, false)
    }

    pub fn register_output(&mut self, comp: CompId, spec: OutputSpec) -> GraphResult<OutputId> {
        self.push_output(comp, spec, false)
    }

    fn push_input(
        &mut self,
        comp: CompId,
        spec: InputSpec,
        tags: Vec<Tag>,
        weight: i32,
        dynamic: bool,
    ) -> GraphResult<InputId> {
        let node = self.node(comp)?;
        if node
            .inputs
            .iter()
            .any(|&i| self.inputs[i.slot()].name == spec.name)
        {
            return Err(GraphError::DuplicateInput {
                component: node.name.clone(),
                input: spec.name,
            });
        }
        debug!(
            component = %node.name,
            input = %spec.name,
            load_type = %spec.load_type,
            unit = %spec.unit,
            mandatory = spec.mandatory,
            "registered input"
        );

        let id = InputId::from_index(self.inputs.len() as u32);
        self.inputs.push(Input {
            id,
            comp,
            name: spec.name,
            load_type: spec.load_type,
            unit: spec.unit,
            mandatory: spec.mandatory,
            source: None,
            tags: tags.clone(),
            weight,
            dynamic,
        });
        let node = self.node_mut(comp)?;
        node.inputs.push(id);
        if dynamic {
            node.dynamic.push_input(id, tags, weight);
        }
        Ok(id)
    }

    fn push_output(&mut self, comp: CompId, spec: OutputSpec, dynamic: bool) -> GraphResult<OutputId> {
        let node = self.node(comp)?;
        if node
            .outputs
            .iter()
            .any(|&o| self.outputs[o.slot()].name == spec.name)
        {
            return Err(GraphError::DuplicateOutput {
                component: node.name.clone(),
                output: spec.name,
            });
        }
        debug!(
            component = %node.name,
            output = %spec.name,
            load_type = %spec.load_type,
            unit = %spec.unit,
            "registered output"
        );

        let id = OutputId::from_index(self.outputs.len() as u32);
        let tags = spec.tags.clone();
        let weight = spec.weight;
        self.outputs.push(Output {
            id,
            comp,
            name: spec.name,
            load_type: spec.load_type,
            unit: spec.unit,
            tags: spec.tags,
            weight: spec.weight,
            description: spec.description,
            global_index: None,
            dynamic,
        });
        let node = self.node_mut(comp)?;
        node.outputs.push(id);
        if dynamic {
            node.dynamic.push_output(id, tags, weight);
        }
        Ok(id)
    }

    /// Record the component's default connection requests for later
    /// automatic wiring.
    pub fn set_default_connections(
        &mut self,
        comp: CompId,
        requests: Vec<ConnectionRequest>,
    ) -> GraphResult<()> {
        self.node_mut(comp)?.default_connections = requests;
        Ok(())
    }

    pub fn find_input(&self, comp: CompId, name: &str) -> GraphResult<InputId> {
        let node = self.node(comp)?;
        node.inputs
            .iter()
            .copied()
            .find(|&i| self.inputs[i.slot()].name == name)
            .ok_or_else(|| GraphError::UnknownInput {
                component: node.name.clone(),
                input: name.to_string(),
            })
    }

    pub fn find_output(&self, comp: CompId, name: &str) -> GraphResult<OutputId> {
        let node = self.node(comp)?;
        node.outputs
            .iter()
            .copied()
            .find(|&o| self.outputs[o.slot()].name == name)
            .ok_or_else(|| GraphError::UnknownOutput {
                component: node.name.clone(),
                output: name.to_string(),
            })
    }

    fn output_label(&self, id: OutputId) -> String {
        let out = &self.outputs[id.slot()];
        format!("{}.{}", self.components[out.comp.slot()].name, out.name)
    }

    /// Wire `input` to the output named `source_output` on `source`.
    pub fn connect(&mut self, input: InputId, source: CompId, source_output: &str) -> GraphResult<()> {
        let output = self.find_output(source, source_output)?;
        self.connect_output(input, output)
    }

    /// Wire `input` to `output`, checking load type and unit.
    pub fn connect_output(&mut self, input: InputId, output: OutputId) -> GraphResult<()> {
        let inp = self
            .inputs
            .get(input.slot())
            .ok_or_else(|| GraphError::UnknownInput {
                component: "?".into(),
                input: format!("{input:?}"),
            })?;
        let out = self
            .outputs
            .get(output.slot())
            .ok_or_else(|| GraphError::UnknownOutput {
                component: "?".into(),
                output: format!("{output:?}"),
            })?;
        let component = self.components[inp.comp.slot()].name.clone();
        let source_name = self.output_label(output);

        if let Some(existing) = inp.source {
            return Err(GraphError::AlreadyConnected {
                component,
                input: inp.name.clone(),
                source_name: self.output_label(existing),
            });
        }
        let context = format!("{source_name} -> {component}.{}", inp.name);
        if !connection::compatible(inp.load_type, inp.unit, out.load_type, out.unit, &context) {
            return Err(GraphError::IncompatiblePorts {
                component,
                input: inp.name.clone(),
                source_name,
                input_load: inp.load_type,
                input_unit: inp.unit,
                source_load: out.load_type,
                source_unit: out.unit,
            });
        }

        debug!(connection = %context, "connected");
        self.inputs[input.slot()].source = Some(output);
        Ok(())
    }

    /// Resolve `comp`'s default connection requests against components added
    /// before it. Each request must match exactly one output. Inputs that are
    /// already wired are left alone. Returns the number of new connections.
    pub fn connect_automatically(&mut self, comp: CompId) -> GraphResult<usize> {
        let requests = self.node(comp)?.default_connections.clone();
        let mut made = 0;
        for req in &requests {
            let input = self.find_input(comp, &req.input)?;
            if self.inputs[input.slot()].is_connected() {
                debug!(input = %req.input, "already wired, skipping default connection");
                continue;
            }

            let candidates: Vec<OutputId> = self.components[..comp.slot()]
                .iter()
                .filter(|c| c.class == req.source_class)
                .filter(|c| req.source_instance.as_ref().is_none_or(|n| *n == c.name))
                .filter_map(|c| self.find_output(c.id, &req.source_output).ok())
                .collect();

            match candidates.as_slice() {
                [only] => {
                    self.connect_output(input, *only)?;
                    made += 1;
                }
                [] => {
                    return Err(GraphError::MissingDefaultSource {
                        component: self.components[comp.slot()].name.clone(),
                        input: req.input.clone(),
                        source_class: req.source_class.clone(),
                        output: req.source_output.clone(),
                    });
                }
                many => {
                    return Err(GraphError::AmbiguousDefaultSource {
                        component: self.components[comp.slot()].name.clone(),
                        input: req.input.clone(),
                        source_class: req.source_class.clone(),
                        output: req.source_output.clone(),
                        candidates: many.len(),
                    });
                }
            }
        }
        Ok(made)
    }

    /// Apply `target`'s default requests for `source`'s class using that exact
    /// instance. Returns the number of connections made.
    pub fn connect_defaults_from(&mut self, target: CompId, source: CompId) -> GraphResult<usize> {
        let source_node = self.node(source)?;
        let (source_class, source_name) = (source_node.class.clone(), source_node.name.clone());
        let requests: Vec<ConnectionRequest> = self
            .node(target)?
            .default_connections
            .iter()
            .filter(|r| r.source_class == source_class)
            .filter(|r| r.source_instance.as_ref().is_none_or(|n| *n == source_name))
            .cloned()
            .collect();

        for req in &requests {
            let input = self.find_input(target, &req.input)?;
            self.connect(input, source, &req.source_output)?;
        }
        Ok(requests.len())
    }

    /// Add an input to `comp` that is tagged for dynamic lookup and wire it to
    /// `source` straight away.
    pub fn add_dynamic_input(
        &mut self,
        comp: CompId,
        spec: InputSpec,
        tags: Vec<Tag>,
        weight: i32,
        source: OutputId,
    ) -> GraphResult<InputId> {
        let id = self.push_input(comp, spec, tags, weight, true)?;
        self.connect_output(id, source)?;
        Ok(id)
    }

    /// Add an output to `comp` that is tagged for dynamic lookup.
    pub fn add_dynamic_output(&mut self, comp: CompId, spec: OutputSpec) -> GraphResult<OutputId> {
        self.push_output(comp, spec, true)
    }

    pub fn dynamic_input_count(&self, comp: CompId) -> GraphResult<usize> {
        Ok(self.node(comp)?.dynamic.inputs().len())
    }

    /// Validate and freeze the graph.
    ///
    /// Fails on the first mandatory input left unwired. Buffer indices are
    /// assigned to outputs in registration order.
    pub fn build(mut self) -> GraphResult<WiringGraph> {
        validate::validate_references(&self.components, &self.inputs, &self.outputs)?;
        validate::validate_mandatory(&self.components, &self.inputs)?;

        for (index, out) in self.outputs.iter_mut().enumerate() {
            out.global_index = Some(index);
        }

        let connections = self
            .inputs
            .iter()
            .filter_map(|i| {
                i.source.map(|source| Connection {
                    source,
                    target: i.id,
                })
            })
            .collect();

        Ok(WiringGraph {
            components: self.components,
            inputs: self.inputs,
            outputs: self.outputs,
            by_name: self.by_name,
            connections,
        })
    }
}
