//! Procedure graph
//!
//! A procedure is an immutable instruction graph plus the ordered parameter
//! list describing its external interface. It is assembled once, optionally
//! validated, and then shared read-only across any number of invocations.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::types::{DataKind, InstructionHandle, KernelHandle, ParamRole, VariableHandle};

/// A typed slot in the procedure graph
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: DataKind,
}

/// One step of a procedure
pub enum Instruction {
    /// Invoke a kernel with the bound argument variables, then continue
    Call {
        kernel: KernelHandle,
        args: Vec<VariableHandle>,
        next: Option<InstructionHandle>,
    },
    /// Partition the batch by a boolean single condition
    Branch {
        condition: VariableHandle,
        on_true: Option<InstructionHandle>,
        on_false: Option<InstructionHandle>,
    },
    /// End a variable's lifetime for the batch, then continue
    Destruct {
        variable: VariableHandle,
        next: Option<InstructionHandle>,
    },
}

impl Instruction {
    fn kind_name(&self) -> &'static str {
        match self {
            Instruction::Call { .. } => "call",
            Instruction::Branch { .. } => "branch",
            Instruction::Destruct { .. } => "destruct",
        }
    }
}

/// Immutable instruction graph with its external parameter list.
///
/// Handles returned by the `add_*` methods are plain indices into the
/// procedure's own tables and stay valid for its whole lifetime. Successors
/// may be wired forward with [`Procedure::set_next`] and
/// [`Procedure::set_branch_targets`] after the target exists;
/// [`Procedure::validate`] checks the finished graph.
#[derive(Default)]
pub struct Procedure {
    variables: Vec<Variable>,
    instructions: Vec<Instruction>,
    kernels: Vec<Arc<dyn Kernel>>,
    params: Vec<(ParamRole, VariableHandle)>,
    entry: Option<InstructionHandle>,
}

impl Procedure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable of the given data kind
    pub fn add_variable(&mut self, name: impl Into<String>, kind: DataKind) -> VariableHandle {
        let handle = VariableHandle(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            kind,
        });
        handle
    }

    /// Registers a kernel in the procedure's kernel table
    pub fn add_kernel(&mut self, kernel: Arc<dyn Kernel>) -> KernelHandle {
        let handle = KernelHandle(self.kernels.len());
        self.kernels.push(kernel);
        handle
    }

    /// Adds a `Call` instruction binding `args` in kernel-signature order
    pub fn add_call(
        &mut self,
        kernel: KernelHandle,
        args: Vec<VariableHandle>,
        next: Option<InstructionHandle>,
    ) -> InstructionHandle {
        self.push(Instruction::Call { kernel, args, next })
    }

    /// Adds a `Branch` instruction on a boolean single condition
    pub fn add_branch(
        &mut self,
        condition: VariableHandle,
        on_true: Option<InstructionHandle>,
        on_false: Option<InstructionHandle>,
    ) -> InstructionHandle {
        self.push(Instruction::Branch {
            condition,
            on_true,
            on_false,
        })
    }

    /// Adds a `Destruct` instruction for `variable`
    pub fn add_destruct(
        &mut self,
        variable: VariableHandle,
        next: Option<InstructionHandle>,
    ) -> InstructionHandle {
        self.push(Instruction::Destruct { variable, next })
    }

    fn push(&mut self, instruction: Instruction) -> InstructionHandle {
        let handle = InstructionHandle(self.instructions.len());
        self.instructions.push(instruction);
        handle
    }

    /// Rewires the successor of a `Call` or `Destruct` instruction
    pub fn set_next(&mut self, instruction: InstructionHandle, next: Option<InstructionHandle>) {
        match &mut self.instructions[instruction.0] {
            Instruction::Call { next: slot, .. } | Instruction::Destruct { next: slot, .. } => {
                *slot = next;
            }
            other => panic!("{instruction} is a {}, it has no single successor", other.kind_name()),
        }
    }

    /// Rewires both successors of a `Branch` instruction
    pub fn set_branch_targets(
        &mut self,
        instruction: InstructionHandle,
        on_true: Option<InstructionHandle>,
        on_false: Option<InstructionHandle>,
    ) {
        match &mut self.instructions[instruction.0] {
            Instruction::Branch {
                on_true: true_slot,
                on_false: false_slot,
                ..
            } => {
                *true_slot = on_true;
                *false_slot = on_false;
            }
            other => panic!("{instruction} is a {}, not a branch", other.kind_name()),
        }
    }

    /// Appends an external parameter bound to `variable`
    pub fn add_parameter(&mut self, role: ParamRole, variable: VariableHandle) {
        self.params.push((role, variable));
    }

    /// Sets the instruction the executor starts from
    pub fn set_entry(&mut self, entry: InstructionHandle) {
        self.entry = Some(entry);
    }

    pub fn entry(&self) -> Option<InstructionHandle> {
        self.entry
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, handle: VariableHandle) -> &Variable {
        &self.variables[handle.0]
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, handle: InstructionHandle) -> &Instruction {
        &self.instructions[handle.0]
    }

    pub fn kernel(&self, handle: KernelHandle) -> &Arc<dyn Kernel> {
        &self.kernels[handle.0]
    }

    /// External parameters, in declaration order
    pub fn params(&self) -> &[(ParamRole, VariableHandle)] {
        &self.params
    }

    /// Checks the graph's structural well-formedness.
    ///
    /// Executing an unvalidated malformed procedure is a contract violation;
    /// hosts are expected to validate once after assembly.
    pub fn validate(&self) -> Result<()> {
        let entry = self.entry.ok_or(Error::MissingEntry)?;
        self.check_target(entry, entry)
            .map_err(|_| Error::UnknownEntry(entry))?;

        for (_, variable) in &self.params {
            if variable.0 >= self.variables.len() {
                return Err(Error::UnknownParameter {
                    variable: *variable,
                });
            }
            let bound_twice = self
                .params
                .iter()
                .filter(|(_, other)| other == variable)
                .count()
                > 1;
            if bound_twice {
                return Err(Error::DuplicateParameter {
                    variable: *variable,
                });
            }
        }

        for (index, instruction) in self.instructions.iter().enumerate() {
            let handle = InstructionHandle(index);
            match instruction {
                Instruction::Call { kernel, args, next } => {
                    if kernel.0 >= self.kernels.len() {
                        return Err(Error::UnknownKernel {
                            instruction: handle,
                            kernel: *kernel,
                        });
                    }
                    let signature = self.kernels[kernel.0].signature();
                    if args.len() != signature.params.len() {
                        return Err(Error::ArityMismatch {
                            instruction: handle,
                            kernel: signature.name.clone(),
                            expected: signature.params.len(),
                            found: args.len(),
                        });
                    }
                    for (arg, category) in args.iter().zip(&signature.params) {
                        let variable = self.check_variable(handle, *arg)?;
                        if variable.kind != category.data_kind() {
                            return Err(Error::KindMismatch {
                                instruction: handle,
                                variable: *arg,
                                expected: category.data_kind(),
                                found: variable.kind,
                            });
                        }
                    }
                    self.check_successor(handle, *next)?;
                }
                Instruction::Branch {
                    condition,
                    on_true,
                    on_false,
                } => {
                    let variable = self.check_variable(handle, *condition)?;
                    if variable.kind != DataKind::Single {
                        return Err(Error::KindMismatch {
                            instruction: handle,
                            variable: *condition,
                            expected: DataKind::Single,
                            found: variable.kind,
                        });
                    }
                    self.check_successor(handle, *on_true)?;
                    self.check_successor(handle, *on_false)?;
                }
                Instruction::Destruct { variable, next } => {
                    self.check_variable(handle, *variable)?;
                    self.check_successor(handle, *next)?;
                }
            }
        }
        Ok(())
    }

    fn check_variable(
        &self,
        instruction: InstructionHandle,
        variable: VariableHandle,
    ) -> Result<&Variable> {
        self.variables.get(variable.0).ok_or(Error::UnknownVariable {
            instruction,
            variable,
        })
    }

    fn check_successor(
        &self,
        from: InstructionHandle,
        target: Option<InstructionHandle>,
    ) -> Result<()> {
        match target {
            Some(target) => self.check_target(from, target),
            None => Ok(()),
        }
    }

    fn check_target(&self, from: InstructionHandle, target: InstructionHandle) -> Result<()> {
        if target.0 < self.instructions.len() {
            Ok(())
        } else {
            Err(Error::UnknownInstruction { from, target })
        }
    }

    /// Renders the instruction graph as Graphviz dot
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph procedure {\n");
        for (index, instruction) in self.instructions.iter().enumerate() {
            let handle = InstructionHandle(index);
            let label = match instruction {
                Instruction::Call { kernel, args, .. } => {
                    let args = args
                        .iter()
                        .map(|arg| self.variable(*arg).name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{handle} call {}({args})", self.kernels[kernel.0].signature().name)
                }
                Instruction::Branch { condition, .. } => {
                    format!("{handle} branch {}", self.variable(*condition).name)
                }
                Instruction::Destruct { variable, .. } => {
                    format!("{handle} destruct {}", self.variable(*variable).name)
                }
            };
            let _ = writeln!(dot, "  {handle} [label=\"{label}\"];");
            match instruction {
                Instruction::Call { next, .. } | Instruction::Destruct { next, .. } => {
                    self.dot_edge(&mut dot, handle, *next, None);
                }
                Instruction::Branch {
                    on_true, on_false, ..
                } => {
                    self.dot_edge(&mut dot, handle, *on_true, Some("true"));
                    self.dot_edge(&mut dot, handle, *on_false, Some("false"));
                }
            }
        }
        if let Some(entry) = self.entry {
            let _ = writeln!(dot, "  entry [shape=point];");
            let _ = writeln!(dot, "  entry -> {entry};");
        }
        dot.push_str("}\n");
        dot
    }

    fn dot_edge(
        &self,
        dot: &mut String,
        from: InstructionHandle,
        target: Option<InstructionHandle>,
        label: Option<&str>,
    ) {
        match (target, label) {
            (Some(target), Some(label)) => {
                let _ = writeln!(dot, "  {from} -> {target} [label=\"{label}\"];");
            }
            (Some(target), None) => {
                let _ = writeln!(dot, "  {from} -> {target};");
            }
            (None, _) => {
                let _ = writeln!(dot, "  sink_{from} [shape=point];");
                let _ = writeln!(dot, "  {from} -> sink_{from};");
            }
        }
    }
}
