//! Procedure validation errors

use thiserror::Error;

use crate::types::{DataKind, InstructionHandle, KernelHandle, VariableHandle};

/// Engine result type
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors reported by procedure validation
#[derive(Debug, Error)]
pub enum Error {
    #[error("procedure has no entry instruction")]
    MissingEntry,

    #[error("entry instruction {0} does not exist")]
    UnknownEntry(InstructionHandle),

    #[error("instruction {instruction} references unknown variable {variable}")]
    UnknownVariable {
        instruction: InstructionHandle,
        variable: VariableHandle,
    },

    #[error("instruction {from} targets unknown instruction {target}")]
    UnknownInstruction {
        from: InstructionHandle,
        target: InstructionHandle,
    },

    #[error("instruction {instruction} references unknown kernel {kernel}")]
    UnknownKernel {
        instruction: InstructionHandle,
        kernel: KernelHandle,
    },

    #[error("call {instruction} to `{kernel}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        instruction: InstructionHandle,
        kernel: String,
        expected: usize,
        found: usize,
    },

    #[error("instruction {instruction} uses {variable} as {expected:?}, but it is {found:?}")]
    KindMismatch {
        instruction: InstructionHandle,
        variable: VariableHandle,
        expected: DataKind,
        found: DataKind,
    },

    #[error("parameter references unknown variable {variable}")]
    UnknownParameter { variable: VariableHandle },

    #[error("variable {variable} is bound to more than one parameter")]
    DuplicateParameter { variable: VariableHandle },
}
