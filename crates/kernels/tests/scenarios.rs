//! End-to-end procedure scenarios over the stock kernels.
//!
//! These assert final results and the engine's conservation and partition
//! invariants; none of them depends on the scheduler's execution order.

use std::sync::{Arc, Mutex};

use cascade_engine::{
    DataKind, EvalContext, IndexMask, InvocationParams, Kernel, KernelParams, KernelSignature,
    ParamRole, Procedure, ProcedureExecutor, SingleBuffer, Value, VectorBuffer, VirtualSingles,
};
use cascade_kernels::{compare, math, vector};

/// Test kernel recording every index it is called on
struct RecordIndices {
    signature: KernelSignature,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl RecordIndices {
    fn new(name: &str) -> (Arc<dyn Kernel>, Arc<Mutex<Vec<usize>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let kernel = Arc::new(Self {
            signature: KernelSignature::new(name, vec![]),
            seen: Arc::clone(&seen),
        });
        (kernel, seen)
    }
}

impl Kernel for RecordIndices {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, _params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        self.seen.lock().unwrap().extend(mask.iter());
    }
}

fn int_values(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn scenario_straight_line_add() {
    let mut procedure = Procedure::new();
    let a = procedure.add_variable("a", DataKind::Single);
    let b = procedure.add_variable("b", DataKind::Single);
    let out = procedure.add_variable("out", DataKind::Single);
    let add = procedure.add_kernel(math::add());
    let call = procedure.add_call(add, vec![a, b, out], None);
    procedure.add_parameter(ParamRole::Input, a);
    procedure.add_parameter(ParamRole::Input, b);
    procedure.add_parameter(ParamRole::Output, out);
    procedure.set_entry(call);
    procedure.validate().unwrap();

    let a_values = int_values(&[1, 2, 3, 4]);
    let b_values = int_values(&[10, 10, 10, 10]);
    let mut out_buffer = SingleBuffer::with_len(4);
    let mut params = InvocationParams::new();
    params.add_single_input(VirtualSingles::Values(&a_values));
    params.add_single_input(VirtualSingles::Values(&b_values));
    params.add_single_output(&mut out_buffer);

    let summary = ProcedureExecutor::new(&procedure).call(
        &IndexMask::from_range(0..4),
        params,
        &mut EvalContext::new(),
    );
    assert_eq!(summary.kernel_calls, 1);
    for (index, expected) in [11, 12, 13, 14].into_iter().enumerate() {
        assert_eq!(out_buffer.get(index), Some(&Value::Int(expected)));
    }
}

/// Branch on `is_even`; negate the even path in place, destruct both paths.
#[test]
fn scenario_branch_and_destruct() {
    let mut procedure = Procedure::new();
    let is_even = procedure.add_variable("is_even", DataKind::Single);
    let values = procedure.add_variable("values", DataKind::Single);
    let negate = procedure.add_kernel(math::negate());

    let true_destruct = procedure.add_destruct(values, None);
    let true_negate = procedure.add_call(negate, vec![values], Some(true_destruct));
    let false_destruct = procedure.add_destruct(values, None);
    let branch = procedure.add_branch(is_even, Some(true_negate), Some(false_destruct));
    procedure.add_parameter(ParamRole::Input, is_even);
    procedure.add_parameter(ParamRole::Mutable, values);
    procedure.set_entry(branch);
    procedure.validate().unwrap();

    let conditions: Vec<Value> = [true, false, true, false]
        .into_iter()
        .map(Value::Bool)
        .collect();
    let mut value_buffer = SingleBuffer::from_values(int_values(&[1, 2, 3, 4]));
    let mut params = InvocationParams::new();
    params.add_single_input(VirtualSingles::Values(&conditions));
    params.add_single_mutable(&mut value_buffer);

    ProcedureExecutor::new(&procedure).call(
        &IndexMask::from_range(0..4),
        params,
        &mut EvalContext::new(),
    );

    // Both paths end in a destruct, so every slot is released; the negation
    // only ever saw the even-condition indices.
    for index in 0..4 {
        assert!(!value_buffer.is_set(index));
    }
}

/// Negate the even path without destructing, so the mutated values survive.
#[test]
fn scenario_branch_negates_only_true_path() {
    let mut procedure = Procedure::new();
    let is_even = procedure.add_variable("is_even", DataKind::Single);
    let values = procedure.add_variable("values", DataKind::Single);
    let negate = procedure.add_kernel(math::negate());

    let true_negate = procedure.add_call(negate, vec![values], None);
    let branch = procedure.add_branch(is_even, Some(true_negate), None);
    procedure.add_parameter(ParamRole::Input, is_even);
    procedure.add_parameter(ParamRole::Mutable, values);
    procedure.set_entry(branch);
    procedure.validate().unwrap();

    let conditions: Vec<Value> = [true, false, true, false]
        .into_iter()
        .map(Value::Bool)
        .collect();
    let mut value_buffer = SingleBuffer::from_values(int_values(&[1, 2, 3, 4]));
    let mut params = InvocationParams::new();
    params.add_single_input(VirtualSingles::Values(&conditions));
    params.add_single_mutable(&mut value_buffer);

    ProcedureExecutor::new(&procedure).call(
        &IndexMask::from_range(0..4),
        params,
        &mut EvalContext::new(),
    );

    for (index, expected) in [-1, 2, -3, 4].into_iter().enumerate() {
        assert_eq!(value_buffer.get(index), Some(&Value::Int(expected)));
    }
}

/// Conservation: every index of the initial mask reaches exactly one sink.
#[test]
fn conservation_across_nested_branches() {
    let mut procedure = Procedure::new();
    let first_cond = procedure.add_variable("first", DataKind::Single);
    let second_cond = procedure.add_variable("second", DataKind::Single);
    let (record_a, seen_a) = RecordIndices::new("sink_a");
    let (record_b, seen_b) = RecordIndices::new("sink_b");
    let (record_c, seen_c) = RecordIndices::new("sink_c");
    let record_a = procedure.add_kernel(record_a);
    let record_b = procedure.add_kernel(record_b);
    let record_c = procedure.add_kernel(record_c);

    let sink_a = procedure.add_call(record_a, vec![], None);
    let sink_b = procedure.add_call(record_b, vec![], None);
    let sink_c = procedure.add_call(record_c, vec![], None);
    let inner = procedure.add_branch(second_cond, Some(sink_a), Some(sink_b));
    let outer = procedure.add_branch(first_cond, Some(inner), Some(sink_c));
    procedure.add_parameter(ParamRole::Input, first_cond);
    procedure.add_parameter(ParamRole::Input, second_cond);
    procedure.set_entry(outer);
    procedure.validate().unwrap();

    let count = 32;
    let first: Vec<Value> = (0..count).map(|i| Value::Bool(i % 2 == 0)).collect();
    let second: Vec<Value> = (0..count).map(|i| Value::Bool(i % 3 == 0)).collect();
    let mut params = InvocationParams::new();
    params.add_single_input(VirtualSingles::Values(&first));
    params.add_single_input(VirtualSingles::Values(&second));

    let mask = IndexMask::from_range(0..count);
    ProcedureExecutor::new(&procedure).call(&mask, params, &mut EvalContext::new());

    let mut reached: Vec<usize> = Vec::new();
    for seen in [&seen_a, &seen_b, &seen_c] {
        reached.extend(seen.lock().unwrap().iter());
    }
    reached.sort_unstable();
    assert_eq!(reached, mask.to_vec());
}

/// Splitting the invocation mask and merging the outputs matches one run.
#[test]
fn batch_split_transparency() {
    let mut procedure = Procedure::new();
    let a = procedure.add_variable("a", DataKind::Single);
    let b = procedure.add_variable("b", DataKind::Single);
    let doubled = procedure.add_variable("doubled", DataKind::Single);
    let out = procedure.add_variable("out", DataKind::Single);
    let mul = procedure.add_kernel(math::mul());
    let add = procedure.add_kernel(math::add());

    let cleanup = procedure.add_destruct(doubled, None);
    let combine = procedure.add_call(add, vec![doubled, b, out], Some(cleanup));
    let double = procedure.add_call(mul, vec![a, a, doubled], Some(combine));
    procedure.add_parameter(ParamRole::Input, a);
    procedure.add_parameter(ParamRole::Input, b);
    procedure.add_parameter(ParamRole::Output, out);
    procedure.set_entry(double);
    procedure.validate().unwrap();

    let count = 16;
    let a_values: Vec<Value> = (0..count).map(|i| Value::Int(i as i64)).collect();
    let b_values: Vec<Value> = (0..count).map(|i| Value::Int(100 - i as i64)).collect();

    let run = |mask: &IndexMask, out_buffer: &mut SingleBuffer| {
        let mut params = InvocationParams::new();
        params.add_single_input(VirtualSingles::Values(&a_values));
        params.add_single_input(VirtualSingles::Values(&b_values));
        params.add_single_output(out_buffer);
        ProcedureExecutor::new(&procedure).call(mask, params, &mut EvalContext::new());
    };

    let mut whole = SingleBuffer::with_len(count);
    run(&IndexMask::from_range(0..count), &mut whole);

    let evens: Vec<usize> = (0..count).step_by(2).collect();
    let odds: Vec<usize> = (1..count).step_by(2).collect();
    let mut merged = SingleBuffer::with_len(count);
    run(&IndexMask::from_indices(evens), &mut merged);
    run(&IndexMask::from_indices(odds), &mut merged);

    for index in 0..count {
        assert_eq!(merged.get(index), whole.get(index));
        assert!(whole.is_set(index));
    }
}

/// Scenario C: N append rounds leave every masked row with length N.
#[test]
fn scenario_vector_accumulation() {
    let rounds = 4;
    let mut procedure = Procedure::new();
    let value = procedure.add_variable("value", DataKind::Single);
    let rows = procedure.add_variable("rows", DataKind::Vector);
    let count = procedure.add_variable("count", DataKind::Single);
    let append = procedure.add_kernel(vector::append());
    let length = procedure.add_kernel(vector::length());

    let measure = procedure.add_call(length, vec![rows, count], None);
    let mut next = measure;
    for _ in 0..rounds {
        next = procedure.add_call(append, vec![value, rows], Some(next));
    }
    procedure.add_parameter(ParamRole::Input, value);
    procedure.add_parameter(ParamRole::Output, rows);
    procedure.add_parameter(ParamRole::Output, count);
    procedure.set_entry(next);
    procedure.validate().unwrap();

    let mask = IndexMask::from_indices(vec![0, 2, 5]);
    let mut row_buffer = VectorBuffer::with_len(6);
    let mut count_buffer = SingleBuffer::with_len(6);
    let mut params = InvocationParams::new();
    params.add_single_input(VirtualSingles::Uniform(Value::Float(1.0)));
    params.add_vector_output(&mut row_buffer);
    params.add_single_output(&mut count_buffer);

    ProcedureExecutor::new(&procedure).call(&mask, params, &mut EvalContext::new());

    for index in mask.iter() {
        assert_eq!(row_buffer.row(index).len(), rounds);
        assert_eq!(count_buffer.get(index), Some(&Value::Int(rounds as i64)));
    }
    assert!(row_buffer.row(1).is_empty());
}

/// A computed branch condition: derive `is_even` with a kernel, then branch
/// on the intermediate variable and destruct it on both paths.
#[test]
fn derived_condition_with_intermediate_destruct() {
    let mut procedure = Procedure::new();
    let input = procedure.add_variable("input", DataKind::Single);
    let parity = procedure.add_variable("parity", DataKind::Single);
    let out = procedure.add_variable("out", DataKind::Single);
    let is_even = procedure.add_kernel(compare::is_even());
    let add = procedure.add_kernel(math::add());
    let (record, skipped) = RecordIndices::new("skipped");
    let record = procedure.add_kernel(record);

    // true path: out = input + input; false path: record and stop.
    let sum = procedure.add_call(add, vec![input, input, out], None);
    let skip = procedure.add_call(record, vec![], None);
    let true_cleanup = procedure.add_destruct(parity, Some(sum));
    let false_cleanup = procedure.add_destruct(parity, Some(skip));
    let branch = procedure.add_branch(parity, Some(true_cleanup), Some(false_cleanup));
    let classify = procedure.add_call(is_even, vec![input, parity], Some(branch));
    procedure.add_parameter(ParamRole::Input, input);
    procedure.add_parameter(ParamRole::Output, out);
    procedure.set_entry(classify);
    procedure.validate().unwrap();

    let values = int_values(&[3, 4, 7, 8]);
    let mut out_buffer = SingleBuffer::with_len(4);
    let mut params = InvocationParams::new();
    params.add_single_input(VirtualSingles::Values(&values));
    params.add_single_output(&mut out_buffer);

    ProcedureExecutor::new(&procedure).call(
        &IndexMask::from_range(0..4),
        params,
        &mut EvalContext::new(),
    );

    assert!(!out_buffer.is_set(0));
    assert_eq!(out_buffer.get(1), Some(&Value::Int(8)));
    assert!(!out_buffer.is_set(2));
    assert_eq!(out_buffer.get(3), Some(&Value::Int(16)));
    let mut skipped = skipped.lock().unwrap().clone();
    skipped.sort_unstable();
    assert_eq!(skipped, vec![0, 2]);
}
