//! Cascade Engine
//!
//! Interprets a compiled graph of elementwise operations (a procedure) over
//! a batch of element indices, equivalent to calling each operation once per
//! element. Batches that diverge at a branch flow down their paths
//! independently; intermediate variables are materialized only for the
//! indices that reach them and freed as soon as they are destructed.
//!
//! Hosts assemble a [`Procedure`], validate it once, and execute it any
//! number of times through [`ProcedureExecutor::call`] with per-invocation
//! [`InvocationParams`]. Kernels implement [`Kernel`] and receive typed
//! parameter views through [`KernelParams`].

pub mod buffer;
pub mod error;
pub mod executor;
pub mod kernel;
pub mod mask;
pub mod params;
pub mod procedure;
pub mod types;
pub mod value;

mod scheduler;
mod store;

pub use buffer::{SingleBuffer, VectorBuffer, VirtualSingles, VirtualVectors};
pub use error::{Error, Result};
pub use executor::{EvalContext, ProcedureExecutor, RunSummary};
pub use kernel::{Kernel, KernelSignature};
pub use mask::IndexMask;
pub use params::{
    InvocationParams, KernelParams, SingleInput, SingleMutable, SingleOutput, VectorInput,
    VectorMutable, VectorOutput,
};
pub use procedure::{Instruction, Procedure, Variable};
pub use types::{DataKind, InstructionHandle, KernelHandle, ParamCategory, ParamRole, VariableHandle};
pub use value::{Value, ValueKind};
