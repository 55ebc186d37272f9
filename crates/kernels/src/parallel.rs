//! Internally parallel kernels
//!
//! The executor treats every kernel call as one blocking operation; a kernel
//! is free to parallelize over its batch internally as long as it only
//! touches the buffers handed to it. These builders gather the masked
//! inputs, run the elementwise function on a rayon pool, and scatter the
//! results back on the calling thread.

use std::sync::Arc;

use rayon::prelude::*;

use cascade_engine::{
    EvalContext, IndexMask, Kernel, KernelParams, KernelSignature, ParamCategory, Value,
};

struct ParUnaryKernel {
    signature: KernelSignature,
    f: Box<dyn Fn(&Value) -> Value + Send + Sync>,
}

impl Kernel for ParUnaryKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let input = params.single_input(0);
        let gathered: Vec<Value> = mask.iter().map(|index| input.get(index)).collect();
        drop(input);

        let results: Vec<Value> = gathered.par_iter().map(|value| (self.f)(value)).collect();

        let mut output = params.single_output(1);
        for (index, result) in mask.iter().zip(results) {
            output.set(index, result);
        }
    }
}

/// Kernel `(in) -> (out)` applying `f` across the batch on a rayon pool
pub fn par_unary(
    name: impl Into<String>,
    f: impl Fn(&Value) -> Value + Send + Sync + 'static,
) -> Arc<dyn Kernel> {
    Arc::new(ParUnaryKernel {
        signature: KernelSignature::new(
            name,
            vec![ParamCategory::SingleInput, ParamCategory::SingleOutput],
        ),
        f: Box::new(f),
    })
}

#[cfg(test)]
mod tests {
    use cascade_engine::{
        DataKind, InvocationParams, ParamRole, Procedure, ProcedureExecutor, SingleBuffer,
        VirtualSingles,
    };

    use super::*;

    #[test]
    fn test_par_unary_matches_serial_results() {
        let mut procedure = Procedure::new();
        let input = procedure.add_variable("input", DataKind::Single);
        let output = procedure.add_variable("output", DataKind::Single);
        let square = procedure.add_kernel(par_unary("square", |v| {
            let x = v.as_float().expect("float input");
            Value::Float(x * x)
        }));
        let call = procedure.add_call(square, vec![input, output], None);
        procedure.add_parameter(ParamRole::Input, input);
        procedure.add_parameter(ParamRole::Output, output);
        procedure.set_entry(call);
        procedure.validate().unwrap();

        let count = 256;
        let values: Vec<Value> = (0..count).map(|i| Value::Float(i as f64)).collect();
        let mut result = SingleBuffer::with_len(count);
        let mut params = InvocationParams::new();
        params.add_single_input(VirtualSingles::Values(&values));
        params.add_single_output(&mut result);

        ProcedureExecutor::new(&procedure).call(
            &IndexMask::from_range(0..count),
            params,
            &mut EvalContext::new(),
        );
        for i in 0..count {
            assert_eq!(result.get(i), Some(&Value::Float((i * i) as f64)));
        }
    }
}
