//! Kernel interface
//!
//! Kernels are the external elementwise operations that `Call` instructions
//! invoke. A kernel receives the batch it must process and typed views of
//! its parameters; it is expected to fully process every masked element
//! before returning.

use crate::executor::EvalContext;
use crate::mask::IndexMask;
use crate::params::KernelParams;
use crate::types::ParamCategory;

/// An external vectorized elementwise operation
pub trait Kernel: Send + Sync {
    /// Name and ordered parameter layout
    fn signature(&self) -> &KernelSignature;

    /// Processes every element selected by `mask`.
    ///
    /// Output parameters must be fully initialized for exactly `mask` when
    /// the call returns.
    fn call(&self, mask: &IndexMask, params: &mut KernelParams<'_>, ctx: &mut EvalContext<'_>);
}

/// Declared shape of a kernel
#[derive(Debug, Clone)]
pub struct KernelSignature {
    pub name: String,
    pub params: Vec<ParamCategory>,
}

impl KernelSignature {
    pub fn new(name: impl Into<String>, params: Vec<ParamCategory>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}
