//! Parameter passing
//!
//! The same six parameter categories appear at two boundaries. The caller
//! hands buffers to the executor through `InvocationParams`, one entry per
//! procedure parameter. For each `Call` instruction the executor then hands
//! the kernel a fresh `KernelParams` holding typed views into the variable
//! stores, one view per kernel parameter.

use std::cell::{Ref, RefMut};

use crate::buffer::{SingleBuffer, VectorBuffer, VirtualSingles, VirtualVectors};
use crate::mask::IndexMask;
use crate::types::ParamCategory;
use crate::value::Value;

/// Caller-supplied procedure arguments, in parameter-list order
#[derive(Default)]
pub struct InvocationParams<'a> {
    pub(crate) entries: Vec<CallerParam<'a>>,
}

pub(crate) enum CallerParam<'a> {
    SingleInput(VirtualSingles<'a>),
    VectorInput(VirtualVectors<'a>),
    SingleOutput(&'a mut SingleBuffer),
    VectorOutput(&'a mut VectorBuffer),
    SingleMutable(&'a mut SingleBuffer),
    VectorMutable(&'a mut VectorBuffer),
}

impl CallerParam<'_> {
    pub(crate) fn category(&self) -> ParamCategory {
        match self {
            CallerParam::SingleInput(_) => ParamCategory::SingleInput,
            CallerParam::VectorInput(_) => ParamCategory::VectorInput,
            CallerParam::SingleOutput(_) => ParamCategory::SingleOutput,
            CallerParam::VectorOutput(_) => ParamCategory::VectorOutput,
            CallerParam::SingleMutable(_) => ParamCategory::SingleMutable,
            CallerParam::VectorMutable(_) => ParamCategory::VectorMutable,
        }
    }
}

impl<'a> InvocationParams<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only single input
    pub fn add_single_input(&mut self, values: VirtualSingles<'a>) {
        self.entries.push(CallerParam::SingleInput(values));
    }

    /// Read-only vector input
    pub fn add_vector_input(&mut self, rows: VirtualVectors<'a>) {
        self.entries.push(CallerParam::VectorInput(rows));
    }

    /// Uninitialized single output; the procedure fills it
    pub fn add_single_output(&mut self, buffer: &'a mut SingleBuffer) {
        self.entries.push(CallerParam::SingleOutput(buffer));
    }

    /// Vector output; the procedure fills its rows
    pub fn add_vector_output(&mut self, buffer: &'a mut VectorBuffer) {
        self.entries.push(CallerParam::VectorOutput(buffer));
    }

    /// Initialized single buffer the procedure may read and write
    pub fn add_single_mutable(&mut self, buffer: &'a mut SingleBuffer) {
        self.entries.push(CallerParam::SingleMutable(buffer));
    }

    /// Vector buffer the procedure may read and write
    pub fn add_vector_mutable(&mut self, buffer: &'a mut VectorBuffer) {
        self.entries.push(CallerParam::VectorMutable(buffer));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single-value read access shared by virtual views and buffers
pub(crate) trait SingleSource {
    fn value_at(&self, index: usize) -> Value;
}

impl SingleSource for VirtualSingles<'_> {
    fn value_at(&self, index: usize) -> Value {
        self.get(index)
    }
}

impl SingleSource for SingleBuffer {
    fn value_at(&self, index: usize) -> Value {
        match self.get(index) {
            Some(value) => value.clone(),
            None => panic!("read of uninitialized element {index}"),
        }
    }
}

/// Row read access shared by virtual views and buffers
pub(crate) trait VectorSource {
    fn row_at(&self, index: usize) -> &[Value];
}

impl VectorSource for VirtualVectors<'_> {
    fn row_at(&self, index: usize) -> &[Value] {
        self.row(index)
    }
}

impl VectorSource for VectorBuffer {
    fn row_at(&self, index: usize) -> &[Value] {
        self.row(index)
    }
}

/// Read-only view of a single-value parameter
pub struct SingleInput<'c> {
    pub(crate) src: Ref<'c, dyn SingleSource + 'c>,
}

impl SingleInput<'_> {
    /// Value at `index`
    pub fn get(&self, index: usize) -> Value {
        self.src.value_at(index)
    }
}

/// Write-only view of an uninitialized single-value parameter
pub struct SingleOutput<'c> {
    pub(crate) buf: RefMut<'c, SingleBuffer>,
}

impl SingleOutput<'_> {
    /// Initializes the value at `index`
    pub fn set(&mut self, index: usize, value: Value) {
        self.buf.set(index, value);
    }

    /// Initializes every masked slot with a copy of `value`
    pub fn fill(&mut self, mask: &IndexMask, value: &Value) {
        self.buf.fill_masked(mask, value);
    }
}

/// Read-write view of an initialized single-value parameter
pub struct SingleMutable<'c> {
    pub(crate) buf: RefMut<'c, SingleBuffer>,
}

impl SingleMutable<'_> {
    pub fn get(&self, index: usize) -> Value {
        self.buf.value_at(index)
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.buf.set(index, value);
    }
}

/// Read-only view of a vector parameter
pub struct VectorInput<'c> {
    pub(crate) src: Ref<'c, dyn VectorSource + 'c>,
}

impl VectorInput<'_> {
    /// Row at `index`
    pub fn row(&self, index: usize) -> &[Value] {
        self.src.row_at(index)
    }
}

/// Write view of a vector parameter being created
pub struct VectorOutput<'c> {
    pub(crate) buf: RefMut<'c, VectorBuffer>,
}

impl VectorOutput<'_> {
    pub fn row(&self, index: usize) -> &[Value] {
        self.buf.row(index)
    }

    pub fn append(&mut self, index: usize, value: Value) {
        self.buf.append(index, value);
    }

    pub fn extend(&mut self, index: usize, values: impl IntoIterator<Item = Value>) {
        self.buf.extend_row(index, values);
    }
}

/// Read-write view of a vector parameter
pub struct VectorMutable<'c> {
    pub(crate) buf: RefMut<'c, VectorBuffer>,
}

impl VectorMutable<'_> {
    pub fn row(&self, index: usize) -> &[Value] {
        self.buf.row(index)
    }

    pub fn append(&mut self, index: usize, value: Value) {
        self.buf.append(index, value);
    }

    pub fn extend(&mut self, index: usize, values: impl IntoIterator<Item = Value>) {
        self.buf.extend_row(index, values);
    }
}

pub(crate) enum ParamView<'c> {
    SingleInput(SingleInput<'c>),
    VectorInput(VectorInput<'c>),
    SingleOutput(SingleOutput<'c>),
    VectorOutput(VectorOutput<'c>),
    SingleMutable(SingleMutable<'c>),
    VectorMutable(VectorMutable<'c>),
    Taken,
}

impl ParamView<'_> {
    fn kind_name(&self) -> &'static str {
        match self {
            ParamView::SingleInput(_) => "single input",
            ParamView::VectorInput(_) => "vector input",
            ParamView::SingleOutput(_) => "single output",
            ParamView::VectorOutput(_) => "vector output",
            ParamView::SingleMutable(_) => "single mutable",
            ParamView::VectorMutable(_) => "vector mutable",
            ParamView::Taken => "already taken",
        }
    }
}

/// Per-call parameter views handed to a kernel.
///
/// Views are taken out by position, matching the kernel's signature order.
/// Each view can be taken once; taking the wrong category is a contract
/// violation on the kernel's side.
pub struct KernelParams<'c> {
    entries: Vec<ParamView<'c>>,
}

impl<'c> KernelParams<'c> {
    pub(crate) fn new(entries: Vec<ParamView<'c>>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take(&mut self, index: usize) -> ParamView<'c> {
        std::mem::replace(&mut self.entries[index], ParamView::Taken)
    }

    /// Takes the read-only single input at `index`
    pub fn single_input(&mut self, index: usize) -> SingleInput<'c> {
        match self.take(index) {
            ParamView::SingleInput(view) => view,
            other => panic!("parameter {index} is {}, expected single input", other.kind_name()),
        }
    }

    /// Takes the single output at `index`
    pub fn single_output(&mut self, index: usize) -> SingleOutput<'c> {
        match self.take(index) {
            ParamView::SingleOutput(view) => view,
            other => panic!("parameter {index} is {}, expected single output", other.kind_name()),
        }
    }

    /// Takes the read-write single parameter at `index`
    pub fn single_mutable(&mut self, index: usize) -> SingleMutable<'c> {
        match self.take(index) {
            ParamView::SingleMutable(view) => view,
            other => panic!("parameter {index} is {}, expected single mutable", other.kind_name()),
        }
    }

    /// Takes the read-only vector input at `index`
    pub fn vector_input(&mut self, index: usize) -> VectorInput<'c> {
        match self.take(index) {
            ParamView::VectorInput(view) => view,
            other => panic!("parameter {index} is {}, expected vector input", other.kind_name()),
        }
    }

    /// Takes the vector output at `index`
    pub fn vector_output(&mut self, index: usize) -> VectorOutput<'c> {
        match self.take(index) {
            ParamView::VectorOutput(view) => view,
            other => panic!("parameter {index} is {}, expected vector output", other.kind_name()),
        }
    }

    /// Takes the read-write vector parameter at `index`
    pub fn vector_mutable(&mut self, index: usize) -> VectorMutable<'c> {
        match self.take(index) {
            ParamView::VectorMutable(view) => view,
            other => panic!("parameter {index} is {}, expected vector mutable", other.kind_name()),
        }
    }
}
