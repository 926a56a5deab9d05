//! Stable buffer indexing.
//!
//! Maps every input to the buffer slot of the output it reads, so the hot
//! loop resolves an input with one array lookup.

use ef_core::{InputId, OutputId};

use crate::graph::WiringGraph;

/// Input → buffer slot mapping for a frozen graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    /// Indexed by input slot; `None` for unwired optional inputs.
    input_source: Vec<Option<usize>>,
    /// Indexed by output slot.
    output_index: Vec<usize>,
}

impl BufferLayout {
    pub fn from_graph(graph: &WiringGraph) -> Self {
        let output_index: Vec<usize> = graph
            .outputs()
            .iter()
            .enumerate()
            .map(|(slot, o)| o.global_index.unwrap_or(slot))
            .collect();
        let input_source = graph
            .inputs()
            .iter()
            .map(|i| i.source.map(|o| output_index[o.slot()]))
            .collect();
        Self {
            input_source,
            output_index,
        }
    }

    /// Number of slots in a value buffer for this layout.
    pub fn len(&self) -> usize {
        self.output_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output_index.is_empty()
    }

    pub fn input_count(&self) -> usize {
        self.input_source.len()
    }

    /// Buffer slot read by `input`, or `None` if it is not wired.
    pub fn source_of(&self, input: InputId) -> Option<usize> {
        self.input_source.get(input.slot()).copied().flatten()
    }

    /// Buffer slot written by `output`.
    pub fn index_of(&self, output: OutputId) -> Option<usize> {
        self.output_index.get(output.slot()).copied()
    }
}
