//! Per-timestep value storage.

use ef_core::{InputId, OutputId, Real, Tolerances, nearly_equal};

use crate::indexing::BufferLayout;

/// One scalar per registered output, indexed by global index.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBuffer {
    values: Vec<Real>,
}

/// A slot whose value moved beyond tolerance between two buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub index: usize,
    pub before: Real,
    pub after: Real,
}

impl Residual {
    pub fn delta(&self) -> Real {
        (self.after - self.before).abs()
    }
}

impl ValueBuffer {
    /// Zero-filled buffer with `len` slots.
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn from_values(values: Vec<Real>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Real> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: Real) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    pub fn as_slice(&self) -> &[Real] {
        &self.values
    }

    pub fn copy_from(&mut self, other: &ValueBuffer) {
        self.values.clone_from(&other.values);
    }

    /// True if every slot is within `tol` of the same slot in `other`.
    pub fn is_close_to(&self, other: &ValueBuffer, tol: Tolerances) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(&a, &b)| nearly_equal(a, b, tol))
    }

    /// Slots that differ from `before` by more than `tol`.
    pub fn residuals(&self, before: &ValueBuffer, tol: Tolerances) -> Vec<Residual> {
        self.values
            .iter()
            .zip(&before.values)
            .enumerate()
            .filter(|&(_, (&after, &before))| !nearly_equal(after, before, tol))
            .map(|(index, (&after, &before))| Residual {
                index,
                before,
                after,
            })
            .collect()
    }
}

/// The view a component gets of the buffer during `simulate`.
///
/// Inputs resolve through the layout to the slot of their source output.
/// Unwired optional inputs read as `0.0`.
pub struct StepValues<'a> {
    buffer: &'a mut ValueBuffer,
    layout: &'a BufferLayout,
}

impl<'a> StepValues<'a> {
    pub fn new(buffer: &'a mut ValueBuffer, layout: &'a BufferLayout) -> Self {
        Self { buffer, layout }
    }

    pub fn input(&self, input: InputId) -> Real {
        self.try_input(input).unwrap_or(0.0)
    }

    /// `None` when the input is not wired.
    pub fn try_input(&self, input: InputId) -> Option<Real> {
        self.layout
            .source_of(input)
            .and_then(|idx| self.buffer.get(idx))
    }

    pub fn is_connected(&self, input: InputId) -> bool {
        self.layout.source_of(input).is_some()
    }

    pub fn set_output(&mut self, output: OutputId, value: Real) {
        if let Some(idx) = self.layout.index_of(output) {
            self.buffer.set(idx, value);
        }
    }

    /// Current value of an output. Within a pass this is what the owner wrote
    /// last, or the previous value if it has not run yet.
    pub fn output(&self, output: OutputId) -> Real {
        self.layout
            .index_of(output)
            .and_then(|idx| self.buffer.get(idx))
            .unwrap_or(0.0)
    }

    /// Sum over a list of inputs, e.g. the result of a dynamic tag query.
    pub fn sum_inputs(&self, inputs: &[InputId]) -> Real {
        inputs.iter().map(|&i| self.input(i)).sum()
    }

    pub fn buffer(&self) -> &ValueBuffer {
        &*self.buffer
    }
}
