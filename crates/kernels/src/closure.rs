//! Closure-backed kernels
//!
//! Builders that wrap a plain elementwise function as a [`Kernel`]. The
//! stock kernels in this crate are built through these; hosts can use them
//! directly for one-off operations without defining a kernel type.

use std::sync::Arc;

use cascade_engine::{
    EvalContext, IndexMask, Kernel, KernelParams, KernelSignature, ParamCategory, Value,
};

/// Elementwise function over one value
pub type UnaryFn = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// Elementwise function over two values
pub type BinaryFn = Box<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

struct UnaryKernel {
    signature: KernelSignature,
    f: UnaryFn,
}

impl Kernel for UnaryKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let input = params.single_input(0);
        let mut output = params.single_output(1);
        for index in mask.iter() {
            output.set(index, (self.f)(&input.get(index)));
        }
    }
}

/// Kernel `(in) -> (out)` applying `f` to every masked element
pub fn unary(
    name: impl Into<String>,
    f: impl Fn(&Value) -> Value + Send + Sync + 'static,
) -> Arc<dyn Kernel> {
    Arc::new(UnaryKernel {
        signature: KernelSignature::new(
            name,
            vec![ParamCategory::SingleInput, ParamCategory::SingleOutput],
        ),
        f: Box::new(f),
    })
}

struct BinaryKernel {
    signature: KernelSignature,
    f: BinaryFn,
}

impl Kernel for BinaryKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let a = params.single_input(0);
        let b = params.single_input(1);
        let mut output = params.single_output(2);
        for index in mask.iter() {
            output.set(index, (self.f)(&a.get(index), &b.get(index)));
        }
    }
}

/// Kernel `(a, b) -> (out)` applying `f` to every masked element
pub fn binary(
    name: impl Into<String>,
    f: impl Fn(&Value, &Value) -> Value + Send + Sync + 'static,
) -> Arc<dyn Kernel> {
    Arc::new(BinaryKernel {
        signature: KernelSignature::new(
            name,
            vec![
                ParamCategory::SingleInput,
                ParamCategory::SingleInput,
                ParamCategory::SingleOutput,
            ],
        ),
        f: Box::new(f),
    })
}

struct InPlaceKernel {
    signature: KernelSignature,
    f: UnaryFn,
}

impl Kernel for InPlaceKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let mut buffer = params.single_mutable(0);
        for index in mask.iter() {
            let updated = (self.f)(&buffer.get(index));
            buffer.set(index, updated);
        }
    }
}

/// Kernel `(inout)` rewriting every masked element with `f`
pub fn in_place(
    name: impl Into<String>,
    f: impl Fn(&Value) -> Value + Send + Sync + 'static,
) -> Arc<dyn Kernel> {
    Arc::new(InPlaceKernel {
        signature: KernelSignature::new(name, vec![ParamCategory::SingleMutable]),
        f: Box::new(f),
    })
}

struct ConstantKernel {
    signature: KernelSignature,
    value: Value,
}

impl Kernel for ConstantKernel {
    fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, _ctx: &mut EvalContext<'_>) {
        let mut output = params.single_output(0);
        output.fill(mask, &self.value);
    }
}

/// Kernel `() -> (out)` initializing every masked element to `value`
pub fn constant(name: impl Into<String>, value: Value) -> Arc<dyn Kernel> {
    Arc::new(ConstantKernel {
        signature: KernelSignature::new(name, vec![ParamCategory::SingleOutput]),
        value,
    })
}
