//! Core engine types
//!
//! Handles are plain indices into the tables owned by a `Procedure`.
//! They stay valid for the procedure's whole lifetime.

use std::fmt;

/// Identifies a variable within one procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableHandle(pub usize);

impl fmt::Display for VariableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identifies an instruction within one procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionHandle(pub usize);

impl fmt::Display for InstructionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Identifies a kernel within one procedure's kernel table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelHandle(pub usize);

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}

/// Whether a variable holds one value or a value list per element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Single,
    Vector,
}

/// Role of a procedure parameter as seen from the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    Input,
    Output,
    Mutable,
}

/// Parameter category in a kernel signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamCategory {
    SingleInput,
    SingleOutput,
    SingleMutable,
    VectorInput,
    VectorOutput,
    VectorMutable,
}

impl ParamCategory {
    /// All categories
    pub const ALL: [ParamCategory; 6] = [
        ParamCategory::SingleInput,
        ParamCategory::SingleOutput,
        ParamCategory::SingleMutable,
        ParamCategory::VectorInput,
        ParamCategory::VectorOutput,
        ParamCategory::VectorMutable,
    ];

    /// Data kind this category carries
    pub fn data_kind(self) -> DataKind {
        match self {
            ParamCategory::SingleInput | ParamCategory::SingleOutput | ParamCategory::SingleMutable => {
                DataKind::Single
            }
            ParamCategory::VectorInput | ParamCategory::VectorOutput | ParamCategory::VectorMutable => {
                DataKind::Vector
            }
        }
    }

    /// Access role this category grants the kernel
    pub fn role(self) -> ParamRole {
        match self {
            ParamCategory::SingleInput | ParamCategory::VectorInput => ParamRole::Input,
            ParamCategory::SingleOutput | ParamCategory::VectorOutput => ParamRole::Output,
            ParamCategory::SingleMutable | ParamCategory::VectorMutable => ParamRole::Mutable,
        }
    }

    /// Category for a data kind and role pair
    pub fn from_parts(kind: DataKind, role: ParamRole) -> Self {
        match (kind, role) {
            (DataKind::Single, ParamRole::Input) => ParamCategory::SingleInput,
            (DataKind::Single, ParamRole::Output) => ParamCategory::SingleOutput,
            (DataKind::Single, ParamRole::Mutable) => ParamCategory::SingleMutable,
            (DataKind::Vector, ParamRole::Input) => ParamCategory::VectorInput,
            (DataKind::Vector, ParamRole::Output) => ParamCategory::VectorOutput,
            (DataKind::Vector, ParamRole::Mutable) => ParamCategory::VectorMutable,
        }
    }
}
