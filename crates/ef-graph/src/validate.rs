//! Graph validation logic.

use crate::error::{GraphError, GraphResult};
use crate::graph::ComponentNode;
use crate::port::{Input, Output};

/// Every port references an existing component that lists it, and every wired
/// input points at an existing output.
pub(crate) fn validate_references(
    components: &[ComponentNode],
    inputs: &[Input],
    outputs: &[Output],
) -> GraphResult<()> {
    for input in inputs {
        let Some(comp) = components.get(input.comp.slot()) else {
            return Err(GraphError::UnknownComponent {
                component: format!("{:?}", input.comp),
            });
        };
        if !comp.inputs.contains(&input.id) {
            return Err(GraphError::UnknownInput {
                component: comp.name.clone(),
                input: input.name.clone(),
            });
        }
        if let Some(src) = input.source
            && src.slot() >= outputs.len()
        {
            return Err(GraphError::UnknownOutput {
                component: comp.name.clone(),
                output: format!("{src:?}"),
            });
        }
    }

    for output in outputs {
        let Some(comp) = components.get(output.comp.slot()) else {
            return Err(GraphError::UnknownComponent {
                component: format!("{:?}", output.comp),
            });
        };
        if !comp.outputs.contains(&output.id) {
            return Err(GraphError::UnknownOutput {
                component: comp.name.clone(),
                output: output.name.clone(),
            });
        }
    }

    Ok(())
}

/// Every mandatory input is wired.
pub(crate) fn validate_mandatory(components: &[ComponentNode], inputs: &[Input]) -> GraphResult<()> {
    match inputs.iter().find(|i| i.mandatory && i.source.is_none()) {
        Some(input) => Err(GraphError::UnwiredMandatoryInput {
            component: components
                .get(input.comp.slot())
                .map_or_else(|| format!("{:?}", input.comp), |c| c.name.clone()),
            input: input.name.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::DynamicPorts;
    use ef_core::{CompId, InputId, LoadType, OutputId, Unit};

    fn node(id: u32, name: &str) -> ComponentNode {
        ComponentNode {
            id: CompId::from_index(id),
            name: name.into(),
            class: "Test".into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            dynamic: DynamicPorts::new(),
            default_connections: Vec::new(),
        }
    }

    fn input(comp: u32, mandatory: bool, source: Option<OutputId>) -> Input {
        Input {
            id: InputId::from_index(0),
            comp: CompId::from_index(comp),
            name: "In".into(),
            load_type: LoadType::Electricity,
            unit: Unit::Watt,
            mandatory,
            source,
            tags: Vec::new(),
            weight: 0,
            dynamic: false,
        }
    }

    #[test]
    fn validate_empty_graph() {
        assert!(validate_references(&[], &[], &[]).is_ok());
        assert!(validate_mandatory(&[], &[]).is_ok());
    }

    #[test]
    fn input_pointing_at_missing_component() {
        let result = validate_references(&[], &[input(3, false, None)], &[]);
        assert!(matches!(result, Err(GraphError::UnknownComponent { .. })));
    }

    #[test]
    fn unwired_optional_input_is_fine() {
        let mut c = node(0, "Meter");
        c.inputs.push(InputId::from_index(0));
        assert!(validate_mandatory(&[c], &[input(0, false, None)]).is_ok());
    }

    #[test]
    fn unwired_mandatory_input_names_component() {
        let mut c = node(0, "Meter");
        c.inputs.push(InputId::from_index(0));
        let err = validate_mandatory(&[c], &[input(0, true, None)]).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnwiredMandatoryInput {
                component: "Meter".into(),
                input: "In".into()
            }
        );
    }
}
