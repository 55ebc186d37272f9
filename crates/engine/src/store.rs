//! Variable stores
//!
//! Runtime storage behind each procedure variable for one invocation.
//! Caller parameters are wrapped as-is; variables internal to the graph get
//! lazily created owned storage that tracks how many elements are
//! initialized and frees its buffer when that count returns to zero.

use std::cell::{Ref, RefCell, RefMut};

use crate::buffer::{SingleBuffer, VectorBuffer, VirtualSingles, VirtualVectors};
use crate::mask::IndexMask;
use crate::params::{
    CallerParam, InvocationParams, ParamView, SingleInput, SingleMutable, SingleOutput,
    SingleSource, VectorInput, VectorMutable, VectorOutput, VectorSource,
};
use crate::procedure::Procedure;
use crate::types::{DataKind, ParamCategory, ParamRole, VariableHandle};

/// Owned single-value storage with an initialized-element count
#[derive(Debug, Default)]
pub(crate) struct SingleOwnStore {
    buffer: Option<SingleBuffer>,
    initialized: usize,
}

impl SingleOwnStore {
    fn ensure_allocated(&mut self, bound: usize) {
        if self.buffer.is_none() {
            self.buffer = Some(SingleBuffer::with_len(bound));
        }
    }
}

/// Owned vector storage with an initialized-element count
#[derive(Debug, Default)]
pub(crate) struct VectorOwnStore {
    buffer: Option<VectorBuffer>,
    initialized: usize,
}

impl VectorOwnStore {
    fn ensure_allocated(&mut self, bound: usize) {
        if self.buffer.is_none() {
            self.buffer = Some(VectorBuffer::with_len(bound));
        }
    }
}

/// Storage strategy backing one variable for one invocation
pub(crate) enum VariableStore<'a> {
    /// Read-only caller single values; never allocates, never destructs
    VirtualSingleFromCaller(VirtualSingles<'a>),
    /// Read-only caller rows; never allocates, never destructs
    VirtualVectorFromCaller(VirtualVectors<'a>),
    /// Caller-owned mutable slots; writable and destructible, never freed here
    SingleFromCaller(&'a mut SingleBuffer),
    /// Caller-owned mutable rows; writable and destructible, never freed here
    VectorFromCaller(&'a mut VectorBuffer),
    /// Engine-owned single storage, freed when fully destructed
    SingleOwn(SingleOwnStore),
    /// Engine-owned vector storage, freed when fully destructed
    VectorOwn(VectorOwnStore),
}

impl<'a> VariableStore<'a> {
    fn kind_name(&self) -> &'static str {
        match self {
            VariableStore::VirtualSingleFromCaller(_) => "read-only single input",
            VariableStore::VirtualVectorFromCaller(_) => "read-only vector input",
            VariableStore::SingleFromCaller(_) => "caller single",
            VariableStore::VectorFromCaller(_) => "caller vector",
            VariableStore::SingleOwn(_) => "own single",
            VariableStore::VectorOwn(_) => "own vector",
        }
    }

    fn as_single_source(&self) -> &(dyn SingleSource + 'a) {
        match self {
            VariableStore::VirtualSingleFromCaller(values) => values,
            VariableStore::SingleFromCaller(buffer) => &**buffer,
            VariableStore::SingleOwn(own) => match own.buffer.as_ref() {
                Some(buffer) => buffer,
                None => panic!("single variable read before initialization"),
            },
            other => panic!("single read on a {} store", other.kind_name()),
        }
    }

    fn as_vector_source(&self) -> &(dyn VectorSource + 'a) {
        match self {
            VariableStore::VirtualVectorFromCaller(rows) => rows,
            VariableStore::VectorFromCaller(buffer) => &**buffer,
            VariableStore::VectorOwn(own) => match own.buffer.as_ref() {
                Some(buffer) => buffer,
                None => panic!("vector variable read before initialization"),
            },
            other => panic!("vector read on a {} store", other.kind_name()),
        }
    }

    /// Write access expects the call to initialize exactly `mask`, so own
    /// stores count those elements as initialized up front.
    fn prepare_single_output(&mut self, mask: &IndexMask, bound: usize) {
        match self {
            VariableStore::SingleFromCaller(_) => {}
            VariableStore::SingleOwn(own) => {
                own.ensure_allocated(bound);
                own.initialized += mask.len();
            }
            other => panic!("single output load on a {} store", other.kind_name()),
        }
    }

    fn prepare_single_mutable(&mut self, bound: usize) {
        match self {
            VariableStore::SingleFromCaller(_) => {}
            VariableStore::SingleOwn(own) => own.ensure_allocated(bound),
            other => panic!("single mutable load on a {} store", other.kind_name()),
        }
    }

    fn prepare_vector_output(&mut self, mask: &IndexMask, bound: usize) {
        match self {
            VariableStore::VectorFromCaller(_) => {}
            VariableStore::VectorOwn(own) => {
                own.ensure_allocated(bound);
                own.initialized += mask.len();
            }
            other => panic!("vector output load on a {} store", other.kind_name()),
        }
    }

    fn prepare_vector_mutable(&mut self, bound: usize) {
        match self {
            VariableStore::VectorFromCaller(_) => {}
            VariableStore::VectorOwn(own) => own.ensure_allocated(bound),
            other => panic!("vector mutable load on a {} store", other.kind_name()),
        }
    }

    fn single_buffer_mut(&mut self) -> &mut SingleBuffer {
        match self {
            VariableStore::SingleFromCaller(buffer) => buffer,
            VariableStore::SingleOwn(own) => {
                own.buffer.as_mut().expect("own buffer allocated before write access")
            }
            other => panic!("single write access on a {} store", other.kind_name()),
        }
    }

    fn vector_buffer_mut(&mut self) -> &mut VectorBuffer {
        match self {
            VariableStore::VectorFromCaller(buffer) => buffer,
            VariableStore::VectorOwn(own) => {
                own.buffer.as_mut().expect("own buffer allocated before write access")
            }
            other => panic!("vector write access on a {} store", other.kind_name()),
        }
    }

    /// Ends the masked elements' lifetime. Caller-owned buffers are cleared
    /// in place; owned buffers are freed once no initialized elements
    /// remain.
    fn destruct(&mut self, mask: &IndexMask) {
        match self {
            VariableStore::VirtualSingleFromCaller(_) | VariableStore::VirtualVectorFromCaller(_) => {}
            VariableStore::SingleFromCaller(buffer) => {
                buffer.release_masked(mask);
            }
            VariableStore::VectorFromCaller(buffer) => {
                buffer.release_masked(mask);
            }
            VariableStore::SingleOwn(own) => {
                let Some(buffer) = own.buffer.as_mut() else { return };
                let released = buffer.release_masked(mask);
                debug_assert_eq!(released, mask.len(), "single elements destructed twice");
                own.initialized = own.initialized.saturating_sub(released);
                if own.initialized == 0 {
                    own.buffer = None;
                }
            }
            VariableStore::VectorOwn(own) => {
                let Some(buffer) = own.buffer.as_mut() else { return };
                buffer.release_masked(mask);
                debug_assert!(own.initialized >= mask.len(), "vector elements destructed twice");
                own.initialized = own.initialized.saturating_sub(mask.len());
                if own.initialized == 0 {
                    own.buffer = None;
                }
            }
        }
    }

    /// Partitions `mask` by reading each element as a boolean
    fn split_by_condition(&self, mask: &IndexMask) -> (Vec<usize>, Vec<usize>) {
        let source = self.as_single_source();
        let mut on_false = Vec::new();
        let mut on_true = Vec::new();
        for index in mask.iter() {
            let value = source.value_at(index);
            match value.as_bool() {
                Some(true) => on_true.push(index),
                Some(false) => on_false.push(index),
                None => panic!(
                    "branch condition at element {index} is {:?}, expected a boolean",
                    value.kind()
                ),
            }
        }
        (on_false, on_true)
    }

    fn is_released(&self) -> bool {
        match self {
            VariableStore::SingleOwn(own) => own.initialized == 0,
            VariableStore::VectorOwn(own) => own.initialized == 0,
            _ => true,
        }
    }
}

/// All variable stores for one invocation.
///
/// Stores live in per-variable cells so one kernel call can hold read views
/// of some variables while writing others. Loading the same variable for
/// reading and writing within one call is a malformed procedure and fails
/// the cell's borrow check.
pub(crate) struct StoreContainer<'a> {
    bound: usize,
    slots: Vec<RefCell<Option<VariableStore<'a>>>>,
}

impl<'a> StoreContainer<'a> {
    /// Wraps the caller's arguments according to the procedure's parameter
    /// list. Graph-internal variables start with no store and get an owned
    /// one on first reference.
    pub(crate) fn new(
        procedure: &Procedure,
        full_mask: &IndexMask,
        params: InvocationParams<'a>,
    ) -> Self {
        let mut slots: Vec<RefCell<Option<VariableStore<'a>>>> = (0..procedure.variables().len())
            .map(|_| RefCell::new(None))
            .collect();

        let supplied = params.entries.len();
        let expected = procedure.params().len();
        assert_eq!(supplied, expected, "procedure takes {expected} arguments, {supplied} were supplied");

        let bound = full_mask.bound();
        for ((role, handle), entry) in procedure.params().iter().zip(params.entries) {
            let variable = procedure.variable(*handle);
            let store = match (*role, variable.kind, entry) {
                (ParamRole::Input, DataKind::Single, CallerParam::SingleInput(values)) => {
                    VariableStore::VirtualSingleFromCaller(values)
                }
                (ParamRole::Input, DataKind::Vector, CallerParam::VectorInput(rows)) => {
                    VariableStore::VirtualVectorFromCaller(rows)
                }
                (ParamRole::Output, DataKind::Single, CallerParam::SingleOutput(buffer))
                | (ParamRole::Mutable, DataKind::Single, CallerParam::SingleMutable(buffer)) => {
                    assert!(
                        buffer.len() >= bound,
                        "buffer for `{}` holds {} elements, the invocation addresses {bound}",
                        variable.name,
                        buffer.len()
                    );
                    VariableStore::SingleFromCaller(buffer)
                }
                (ParamRole::Output, DataKind::Vector, CallerParam::VectorOutput(buffer))
                | (ParamRole::Mutable, DataKind::Vector, CallerParam::VectorMutable(buffer)) => {
                    assert!(
                        buffer.len() >= bound,
                        "buffer for `{}` holds {} elements, the invocation addresses {bound}",
                        variable.name,
                        buffer.len()
                    );
                    VariableStore::VectorFromCaller(buffer)
                }
                (role, kind, entry) => panic!(
                    "parameter `{}` expects a {kind:?} {role:?}, got a {:?} argument",
                    variable.name,
                    entry.category()
                ),
            };
            slots[handle.0] = RefCell::new(Some(store));
        }

        Self { bound, slots }
    }

    fn ensure_store(&self, handle: VariableHandle, kind: DataKind) {
        let occupied = self.slots[handle.0].borrow().is_some();
        if occupied {
            return;
        }
        let store = match kind {
            DataKind::Single => VariableStore::SingleOwn(SingleOwnStore::default()),
            DataKind::Vector => VariableStore::VectorOwn(VectorOwnStore::default()),
        };
        *self.slots[handle.0].borrow_mut() = Some(store);
    }

    fn read_guard<'c>(
        slot: &'c RefCell<Option<VariableStore<'a>>>,
        handle: VariableHandle,
    ) -> Ref<'c, Option<VariableStore<'a>>> {
        slot.try_borrow().unwrap_or_else(|_| {
            panic!("variable {handle} is write-loaded elsewhere in this call")
        })
    }

    fn write_guard<'c>(
        slot: &'c RefCell<Option<VariableStore<'a>>>,
        handle: VariableHandle,
    ) -> RefMut<'c, Option<VariableStore<'a>>> {
        slot.try_borrow_mut().unwrap_or_else(|_| {
            panic!("variable {handle} is already loaded elsewhere in this call")
        })
    }

    /// Looks up (or lazily creates) the store for `handle` and registers it
    /// under the requested parameter category, returning the view to hand
    /// to the kernel.
    pub(crate) fn load_param(
        &self,
        handle: VariableHandle,
        kind: DataKind,
        category: ParamCategory,
        mask: &IndexMask,
    ) -> ParamView<'_> {
        debug_assert_eq!(kind, category.data_kind());
        self.ensure_store(handle, kind);
        let slot = &self.slots[handle.0];
        match category {
            ParamCategory::SingleInput => {
                let guard = Self::read_guard(slot, handle);
                ParamView::SingleInput(SingleInput {
                    src: Ref::map(guard, |stored| {
                        stored.as_ref().expect("store ensured above").as_single_source()
                    }),
                })
            }
            ParamCategory::VectorInput => {
                let guard = Self::read_guard(slot, handle);
                ParamView::VectorInput(VectorInput {
                    src: Ref::map(guard, |stored| {
                        stored.as_ref().expect("store ensured above").as_vector_source()
                    }),
                })
            }
            ParamCategory::SingleOutput => {
                let mut guard = Self::write_guard(slot, handle);
                guard
                    .as_mut()
                    .expect("store ensured above")
                    .prepare_single_output(mask, self.bound);
                ParamView::SingleOutput(SingleOutput {
                    buf: RefMut::map(guard, |stored| {
                        stored.as_mut().expect("store ensured above").single_buffer_mut()
                    }),
                })
            }
            ParamCategory::SingleMutable => {
                let mut guard = Self::write_guard(slot, handle);
                guard
                    .as_mut()
                    .expect("store ensured above")
                    .prepare_single_mutable(self.bound);
                ParamView::SingleMutable(SingleMutable {
                    buf: RefMut::map(guard, |stored| {
                        stored.as_mut().expect("store ensured above").single_buffer_mut()
                    }),
                })
            }
            ParamCategory::VectorOutput => {
                let mut guard = Self::write_guard(slot, handle);
                guard
                    .as_mut()
                    .expect("store ensured above")
                    .prepare_vector_output(mask, self.bound);
                ParamView::VectorOutput(VectorOutput {
                    buf: RefMut::map(guard, |stored| {
                        stored.as_mut().expect("store ensured above").vector_buffer_mut()
                    }),
                })
            }
            ParamCategory::VectorMutable => {
                let mut guard = Self::write_guard(slot, handle);
                guard
                    .as_mut()
                    .expect("store ensured above")
                    .prepare_vector_mutable(self.bound);
                ParamView::VectorMutable(VectorMutable {
                    buf: RefMut::map(guard, |stored| {
                        stored.as_mut().expect("store ensured above").vector_buffer_mut()
                    }),
                })
            }
        }
    }

    /// Destructs the masked elements of `handle`. A variable that never
    /// materialized a store needs no destruction; this is a silent no-op.
    pub(crate) fn destruct(&self, handle: VariableHandle, mask: &IndexMask) {
        let mut guard = self.slots[handle.0].try_borrow_mut().unwrap_or_else(|_| {
            panic!("variable {handle} destructed while loaded")
        });
        if let Some(store) = guard.as_mut() {
            store.destruct(mask);
        }
    }

    /// Partitions `mask` by the boolean values of `handle`, returning the
    /// `(false, true)` index lists
    pub(crate) fn split_by_condition(
        &self,
        handle: VariableHandle,
        mask: &IndexMask,
    ) -> (Vec<usize>, Vec<usize>) {
        let guard = self.slots[handle.0].borrow();
        let store = guard
            .as_ref()
            .unwrap_or_else(|| panic!("branch condition {handle} read before initialization"));
        store.split_by_condition(mask)
    }

    /// End-of-invocation check: every owned store must have returned to
    /// zero initialized elements.
    pub(crate) fn finish(&self) {
        if cfg!(debug_assertions) {
            for (index, slot) in self.slots.iter().enumerate() {
                if let Some(store) = slot.borrow().as_ref() {
                    assert!(
                        store.is_released(),
                        "variable v{index} still holds initialized elements at end of invocation"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn own_single_fixture() -> (Procedure, VariableHandle) {
        let mut procedure = Procedure::new();
        let var = procedure.add_variable("tmp", DataKind::Single);
        (procedure, var)
    }

    fn take_single_output(view: ParamView<'_>) -> SingleOutput<'_> {
        match view {
            ParamView::SingleOutput(out) => out,
            _ => panic!("expected single output view"),
        }
    }

    fn take_single_input(view: ParamView<'_>) -> SingleInput<'_> {
        match view {
            ParamView::SingleInput(input) => input,
            _ => panic!("expected single input view"),
        }
    }

    fn take_vector_output(view: ParamView<'_>) -> VectorOutput<'_> {
        match view {
            ParamView::VectorOutput(out) => out,
            _ => panic!("expected vector output view"),
        }
    }

    fn own_single_state(container: &StoreContainer<'_>, handle: VariableHandle) -> (bool, usize) {
        let guard = container.slots[handle.0].borrow();
        match guard.as_ref() {
            Some(VariableStore::SingleOwn(own)) => (own.buffer.is_some(), own.initialized),
            _ => panic!("expected an own single store"),
        }
    }

    #[test]
    fn test_own_single_lifecycle_frees_at_zero() {
        let (procedure, var) = own_single_fixture();
        let mask = IndexMask::from_range(0..4);
        let container = StoreContainer::new(&procedure, &mask, InvocationParams::new());

        {
            let mut out = take_single_output(container.load_param(
                var,
                DataKind::Single,
                ParamCategory::SingleOutput,
                &mask,
            ));
            for index in mask.iter() {
                out.set(index, Value::Int(index as i64));
            }
        }
        assert_eq!(own_single_state(&container, var), (true, 4));

        {
            let input = take_single_input(container.load_param(
                var,
                DataKind::Single,
                ParamCategory::SingleInput,
                &mask,
            ));
            assert_eq!(input.get(2), Value::Int(2));
        }

        container.destruct(var, &mask);
        assert_eq!(own_single_state(&container, var), (false, 0));
        container.finish();
    }

    #[test]
    fn test_own_single_partial_destruct_keeps_buffer() {
        let (procedure, var) = own_single_fixture();
        let mask = IndexMask::from_range(0..4);
        let container = StoreContainer::new(&procedure, &mask, InvocationParams::new());

        {
            let mut out = take_single_output(container.load_param(
                var,
                DataKind::Single,
                ParamCategory::SingleOutput,
                &mask,
            ));
            for index in mask.iter() {
                out.set(index, Value::Bool(index % 2 == 0));
            }
        }

        container.destruct(var, &IndexMask::from_indices(vec![0, 2]));
        assert_eq!(own_single_state(&container, var), (true, 2));

        container.destruct(var, &IndexMask::from_indices(vec![1, 3]));
        assert_eq!(own_single_state(&container, var), (false, 0));
    }

    #[test]
    fn test_vector_own_accumulates_one_element_per_round() {
        let mut procedure = Procedure::new();
        let var = procedure.add_variable("acc", DataKind::Vector);
        let mask = IndexMask::from_range(0..3);
        let container = StoreContainer::new(&procedure, &mask, InvocationParams::new());

        let rounds = 5;
        for round in 0..rounds {
            let mut out = take_vector_output(container.load_param(
                var,
                DataKind::Vector,
                ParamCategory::VectorOutput,
                &mask,
            ));
            for index in mask.iter() {
                out.append(index, Value::Int(round));
            }
        }

        let view = container.load_param(var, DataKind::Vector, ParamCategory::VectorInput, &mask);
        let rows = match &view {
            ParamView::VectorInput(input) => input,
            _ => panic!("expected vector input view"),
        };
        for index in mask.iter() {
            assert_eq!(rows.row(index).len(), rounds as usize);
        }
    }

    #[test]
    fn test_destruct_unmaterialized_variable_is_noop() {
        let (procedure, var) = own_single_fixture();
        let mask = IndexMask::from_range(0..4);
        let container = StoreContainer::new(&procedure, &mask, InvocationParams::new());

        container.destruct(var, &mask);
        container.finish();
    }

    #[test]
    fn test_empty_mask_operations_are_noops() {
        let (procedure, var) = own_single_fixture();
        let full = IndexMask::from_range(0..4);
        let empty = IndexMask::empty();
        let container = StoreContainer::new(&procedure, &full, InvocationParams::new());

        let _ = container.load_param(var, DataKind::Single, ParamCategory::SingleOutput, &empty);
        assert_eq!(own_single_state(&container, var), (true, 0));
        container.destruct(var, &empty);
        container.finish();
    }

    #[test]
    #[should_panic(expected = "read-only")]
    fn test_virtual_input_rejects_mutable_load() {
        let mut procedure = Procedure::new();
        let var = procedure.add_variable("values", DataKind::Single);
        procedure.add_parameter(ParamRole::Input, var);

        let values = vec![Value::Int(1), Value::Int(2)];
        let mut params = InvocationParams::new();
        params.add_single_input(VirtualSingles::Values(&values));

        let mask = IndexMask::from_range(0..2);
        let container = StoreContainer::new(&procedure, &mask, params);
        let _ = container.load_param(var, DataKind::Single, ParamCategory::SingleMutable, &mask);
    }

    #[test]
    fn test_caller_output_written_through_store() {
        let mut procedure = Procedure::new();
        let var = procedure.add_variable("result", DataKind::Single);
        procedure.add_parameter(ParamRole::Output, var);

        let mut buffer = SingleBuffer::with_len(3);
        let mask = IndexMask::from_range(0..3);
        {
            let mut params = InvocationParams::new();
            params.add_single_output(&mut buffer);
            let container = StoreContainer::new(&procedure, &mask, params);
            let mut out = take_single_output(container.load_param(
                var,
                DataKind::Single,
                ParamCategory::SingleOutput,
                &mask,
            ));
            for index in mask.iter() {
                out.set(index, Value::Float(index as f64));
            }
        }
        assert_eq!(buffer.get(2), Some(&Value::Float(2.0)));
    }

    #[test]
    fn test_same_variable_readable_twice_in_one_call() {
        let mut procedure = Procedure::new();
        let var = procedure.add_variable("values", DataKind::Single);
        procedure.add_parameter(ParamRole::Input, var);

        let values = vec![Value::Int(7)];
        let mut params = InvocationParams::new();
        params.add_single_input(VirtualSingles::Values(&values));

        let mask = IndexMask::from_range(0..1);
        let container = StoreContainer::new(&procedure, &mask, params);
        let a = take_single_input(container.load_param(
            var,
            DataKind::Single,
            ParamCategory::SingleInput,
            &mask,
        ));
        let b = take_single_input(container.load_param(
            var,
            DataKind::Single,
            ParamCategory::SingleInput,
            &mask,
        ));
        assert_eq!(a.get(0), b.get(0));
    }

    #[test]
    #[should_panic(expected = "already loaded")]
    fn test_aliasing_read_and_write_of_one_variable_panics() {
        let (procedure, var) = own_single_fixture();
        let mask = IndexMask::from_range(0..2);
        let container = StoreContainer::new(&procedure, &mask, InvocationParams::new());

        {
            let mut out = take_single_output(container.load_param(
                var,
                DataKind::Single,
                ParamCategory::SingleOutput,
                &mask,
            ));
            out.fill(&mask, &Value::Int(1));
        }

        let _read = take_single_input(container.load_param(
            var,
            DataKind::Single,
            ParamCategory::SingleInput,
            &mask,
        ));
        let _write = container.load_param(var, DataKind::Single, ParamCategory::SingleMutable, &mask);
    }

    #[test]
    fn test_split_by_condition_partitions_mask() {
        let mut procedure = Procedure::new();
        let var = procedure.add_variable("cond", DataKind::Single);
        procedure.add_parameter(ParamRole::Input, var);

        let values = vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Bool(true),
            Value::Bool(false),
        ];
        let mut params = InvocationParams::new();
        params.add_single_input(VirtualSingles::Values(&values));

        let mask = IndexMask::from_range(0..4);
        let container = StoreContainer::new(&procedure, &mask, params);
        let (on_false, on_true) = container.split_by_condition(var, &mask);
        assert_eq!(on_true, vec![0, 2]);
        assert_eq!(on_false, vec![1, 3]);

        let mut union: Vec<usize> = on_true.iter().chain(&on_false).copied().collect();
        union.sort_unstable();
        assert_eq!(union, mask.to_vec());
    }

    #[test]
    fn test_mutable_load_allocates_own_buffer_without_initializing() {
        let (procedure, var) = own_single_fixture();
        let mask = IndexMask::from_range(0..4);
        let container = StoreContainer::new(&procedure, &mask, InvocationParams::new());

        let _ = container.load_param(var, DataKind::Single, ParamCategory::SingleMutable, &mask);
        assert_eq!(own_single_state(&container, var), (true, 0));
    }
}
