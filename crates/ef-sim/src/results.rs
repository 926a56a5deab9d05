//! Committed value history, indexed by (timestep, output).

use chrono::NaiveDateTime;
use ef_core::{LoadType, OutputId, Unit};
use ef_graph::{ValueBuffer, WiringGraph};
use serde::Serialize;

use crate::params::SimulationParameters;

/// Metadata for one output column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub component: String,
    pub output: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub description: Option<String>,
}

impl ColumnInfo {
    /// `Component - Output [LoadType - Unit]`
    pub fn pretty_name(&self) -> String {
        format!(
            "{} - {} [{} - {}]",
            self.component, self.output, self.load_type, self.unit
        )
    }
}

/// One row per committed timestep, one column per output in buffer order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    columns: Vec<ColumnInfo>,
    timestamps: Vec<NaiveDateTime>,
    rows: Vec<Vec<f64>>,
}

impl ResultTable {
    pub fn new(graph: &WiringGraph, params: &SimulationParameters) -> Self {
        let mut ordered: Vec<_> = graph.outputs().iter().collect();
        ordered.sort_by_key(|o| o.global_index);
        let columns = ordered
            .into_iter()
            .map(|o| ColumnInfo {
                component: graph
                    .component(o.comp)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                output: o.name.clone(),
                load_type: o.load_type,
                unit: o.unit,
                description: o.description.clone(),
            })
            .collect();
        Self {
            columns,
            timestamps: Vec::with_capacity(params.timesteps()),
            rows: Vec::with_capacity(params.timesteps()),
        }
    }

    pub(crate) fn push_row(&mut self, timestamp: NaiveDateTime, values: &ValueBuffer) {
        self.timestamps.push(timestamp);
        self.rows.push(values.as_slice().to_vec());
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Committed timesteps.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, timestep: usize) -> Option<&[f64]> {
        self.rows.get(timestep).map(Vec::as_slice)
    }

    pub fn value(&self, timestep: usize, output: OutputId) -> Option<f64> {
        self.row(timestep)
            .and_then(|r| r.get(output.slot()).copied())
    }

    pub fn column_index(&self, component: &str, output: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.component == component && c.output == output)
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.get(index).copied())
            .collect()
    }

    pub fn column_by_name(&self, component: &str, output: &str) -> Option<Vec<f64>> {
        self.column_index(component, output).map(|i| self.column(i))
    }

    pub fn column_sum(&self, index: usize) -> f64 {
        self.rows.iter().filter_map(|r| r.get(index)).sum()
    }
}
