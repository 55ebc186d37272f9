//! Procedure executor
//!
//! The driver loop for one invocation: seed the scheduler with the entry
//! instruction and the full mask, then pop and execute pending batches until
//! none remain. Calls forward their batch unchanged, branches partition it,
//! destructs end a variable's data for it, and `None` successors absorb it.

use std::any::Any;

use tracing::{debug, instrument, trace};

use crate::mask::IndexMask;
use crate::params::{InvocationParams, KernelParams};
use crate::procedure::{Instruction, Procedure};
use crate::scheduler::Scheduler;
use crate::store::StoreContainer;

/// Per-invocation context handed through to kernels.
///
/// The engine does not interpret it; hosts can attach arbitrary payloads for
/// their kernels to downcast.
#[derive(Default)]
pub struct EvalContext<'a> {
    user_data: Option<&'a mut dyn Any>,
}

impl<'a> EvalContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying a host payload
    pub fn with_user_data(data: &'a mut dyn Any) -> Self {
        Self {
            user_data: Some(data),
        }
    }

    /// The host payload, if one of type `T` was attached
    pub fn user_data<T: 'static>(&mut self) -> Option<&mut T> {
        self.user_data.as_deref_mut()?.downcast_mut()
    }
}

/// Counters reported by [`ProcedureExecutor::call`].
///
/// Informational only; an invocation that returns has run to structural
/// completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Instructions executed, counting each batch separately
    pub instructions_executed: usize,
    /// Kernel invocations made by `Call` instructions
    pub kernel_calls: usize,
}

/// Runs a procedure over batches of element indices
pub struct ProcedureExecutor<'p> {
    procedure: &'p Procedure,
}

impl<'p> ProcedureExecutor<'p> {
    pub fn new(procedure: &'p Procedure) -> Self {
        Self { procedure }
    }

    /// Executes the procedure for every index in `mask`.
    ///
    /// `params` must supply one argument per procedure parameter, in order.
    /// Equivalent to running the procedure once per index; runs to
    /// completion before returning.
    #[instrument(skip_all, fields(elements = mask.len()))]
    pub fn call(
        &self,
        mask: &IndexMask,
        params: InvocationParams<'_>,
        ctx: &mut EvalContext<'_>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let container = StoreContainer::new(self.procedure, mask, params);
        if mask.is_empty() {
            return summary;
        }
        let entry = self
            .procedure
            .entry()
            .expect("procedure has no entry instruction");

        let mut scheduler = Scheduler::new();
        scheduler.enqueue_mask(Some(entry), mask.clone());

        while let Some((handle, batch)) = scheduler.pop_next() {
            summary.instructions_executed += 1;
            match self.procedure.instruction(handle) {
                Instruction::Call { kernel, args, next } => {
                    let kernel = self.procedure.kernel(*kernel);
                    let signature = kernel.signature();
                    trace!(instruction = %handle, kernel = %signature.name, elements = batch.len(), "call");
                    let views = signature
                        .params
                        .iter()
                        .zip(args)
                        .map(|(category, arg)| {
                            let kind = self.procedure.variable(*arg).kind;
                            container.load_param(*arg, kind, *category, &batch)
                        })
                        .collect();
                    let mut kernel_params = KernelParams::new(views);
                    kernel.call(&batch, &mut kernel_params, ctx);
                    summary.kernel_calls += 1;
                    scheduler.enqueue_mask(*next, batch);
                }
                Instruction::Branch {
                    condition,
                    on_true,
                    on_false,
                } => {
                    let (false_indices, true_indices) =
                        container.split_by_condition(*condition, &batch);
                    trace!(
                        instruction = %handle,
                        on_true = true_indices.len(),
                        on_false = false_indices.len(),
                        "branch"
                    );
                    scheduler.enqueue_indices(*on_true, true_indices);
                    scheduler.enqueue_indices(*on_false, false_indices);
                }
                Instruction::Destruct { variable, next } => {
                    trace!(instruction = %handle, variable = %variable, elements = batch.len(), "destruct");
                    container.destruct(*variable, &batch);
                    scheduler.enqueue_mask(*next, batch);
                }
            }
        }

        debug_assert!(scheduler.is_empty());
        container.finish();
        debug!(
            instructions = summary.instructions_executed,
            kernels = summary.kernel_calls,
            "invocation complete"
        );
        summary
    }
}
