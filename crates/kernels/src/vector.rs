//! Vector-list kernels
//!
//! Operations over Vector variables, which hold a growable value list per
//! element.

use std::sync::Arc;

use cascade_engine::{
    EvalContext, IndexMask, Kernel, KernelParams, KernelSignature, ParamCategory, Value,
};

struct AppendKernel {
    signature: KernelSignature,
}

impl Kernel for AppendKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let values = params.single_input(0);
        let mut rows = params.vector_output(1);
        for index in mask.iter() {
            rows.append(index, values.get(index));
        }
    }
}

/// Kernel `(value, rows)`: appends each element's single value to its row
pub fn append() -> Arc<dyn Kernel> {
    Arc::new(AppendKernel {
        signature: KernelSignature::new(
            "append",
            vec![ParamCategory::SingleInput, ParamCategory::VectorOutput],
        ),
    })
}

struct LengthKernel {
    signature: KernelSignature,
}

impl Kernel for LengthKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let rows = params.vector_input(0);
        let mut output = params.single_output(1);
        for index in mask.iter() {
            output.set(index, Value::Int(rows.row(index).len() as i64));
        }
    }
}

/// Kernel `(rows) -> (out)`: each element's row length as an `Int`
pub fn length() -> Arc<dyn Kernel> {
    Arc::new(LengthKernel {
        signature: KernelSignature::new(
            "length",
            vec![ParamCategory::VectorInput, ParamCategory::SingleOutput],
        ),
    })
}

struct SumKernel {
    signature: KernelSignature,
}

impl Kernel for SumKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let rows = params.vector_input(0);
        let mut output = params.single_output(1);
        for index in mask.iter() {
            let total = rows
                .row(index)
                .iter()
                .map(|value| match value {
                    Value::Int(v) => *v as f64,
                    Value::Float(v) => *v,
                    other => panic!("expected a number, got {:?}", other.kind()),
                })
                .sum();
            output.set(index, Value::Float(total));
        }
    }
}

/// Kernel `(rows) -> (out)`: numeric sum of each element's row
pub fn sum() -> Arc<dyn Kernel> {
    Arc::new(SumKernel {
        signature: KernelSignature::new(
            "sum",
            vec![ParamCategory::VectorInput, ParamCategory::SingleOutput],
        ),
    })
}
