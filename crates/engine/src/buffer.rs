//! Element buffers
//!
//! The concrete storage passed through params: read-only virtual views over
//! caller data, and mutable slot/row buffers. Owned variable stores reuse
//! the same mutable buffer types internally.

use std::fmt;

use crate::mask::IndexMask;
use crate::value::Value;

/// Read-only single values supplied by the caller
pub enum VirtualSingles<'a> {
    /// One value per index
    Values(&'a [Value]),
    /// The same value for every index
    Uniform(Value),
    /// Values produced on demand
    Computed(&'a (dyn Fn(usize) -> Value + Send + Sync)),
}

impl VirtualSingles<'_> {
    /// Value at `index`
    pub fn get(&self, index: usize) -> Value {
        match self {
            VirtualSingles::Values(values) => values[index].clone(),
            VirtualSingles::Uniform(value) => value.clone(),
            VirtualSingles::Computed(f) => f(index),
        }
    }
}

impl fmt::Debug for VirtualSingles<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualSingles::Values(values) => f.debug_tuple("Values").field(values).finish(),
            VirtualSingles::Uniform(value) => f.debug_tuple("Uniform").field(value).finish(),
            VirtualSingles::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Read-only per-element value lists supplied by the caller
#[derive(Debug)]
pub enum VirtualVectors<'a> {
    /// One row per index
    Rows(&'a [Vec<Value>]),
    /// The same row for every index
    Uniform(&'a [Value]),
}

impl VirtualVectors<'_> {
    /// Row at `index`
    pub fn row(&self, index: usize) -> &[Value] {
        match self {
            VirtualVectors::Rows(rows) => &rows[index],
            VirtualVectors::Uniform(row) => row,
        }
    }
}

/// Mutable single-value storage, one optional slot per element.
///
/// A slot is either initialized (holds a value) or empty. Reads of empty
/// slots are contract violations on the reader's side; the buffer itself
/// reports them as `None`.
#[derive(Debug, Clone, Default)]
pub struct SingleBuffer {
    slots: Vec<Option<Value>>,
}

impl SingleBuffer {
    /// Buffer of `len` empty slots
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Buffer with every slot initialized from `values`
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            slots: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Value at `index`, `None` while the slot is empty
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots[index].as_ref()
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.slots[index].is_some()
    }

    /// Writes `value`, reporting whether the slot was previously empty
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        self.slots[index].replace(value).is_none()
    }

    /// Removes and returns the value at `index`
    pub fn take(&mut self, index: usize) -> Option<Value> {
        self.slots[index].take()
    }

    /// Assigns a copy of `value` to every masked slot
    pub fn fill_masked(&mut self, mask: &IndexMask, value: &Value) {
        for index in mask.iter() {
            self.slots[index] = Some(value.clone());
        }
    }

    /// Empties the masked slots, returning how many held a value
    pub fn release_masked(&mut self, mask: &IndexMask) -> usize {
        let mut released = 0;
        for index in mask.iter() {
            if self.slots[index].take().is_some() {
                released += 1;
            }
        }
        released
    }
}

/// Mutable per-element value lists.
///
/// Releasing rows clears them in place and keeps their capacity; the
/// backing allocation is freed only when the whole buffer is dropped.
#[derive(Debug, Clone, Default)]
pub struct VectorBuffer {
    rows: Vec<Vec<Value>>,
}

impl VectorBuffer {
    /// Buffer of `len` empty rows
    pub fn with_len(len: usize) -> Self {
        Self {
            rows: vec![Vec::new(); len],
        }
    }

    /// Buffer from explicit rows
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `index`
    pub fn row(&self, index: usize) -> &[Value] {
        &self.rows[index]
    }

    /// Mutable row at `index`
    pub fn row_mut(&mut self, index: usize) -> &mut Vec<Value> {
        &mut self.rows[index]
    }

    /// Appends one value to the row at `index`
    pub fn append(&mut self, index: usize, value: Value) {
        self.rows[index].push(value);
    }

    /// Appends every value to the row at `index`
    pub fn extend_row(&mut self, index: usize, values: impl IntoIterator<Item = Value>) {
        self.rows[index].extend(values);
    }

    /// Empties the masked rows in place, retaining row capacity
    pub fn release_masked(&mut self, mask: &IndexMask) {
        for index in mask.iter() {
            self.rows[index].clear();
        }
    }
}
