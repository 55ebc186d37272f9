//! Instruction scheduler
//!
//! The work list driving one invocation: pending index batches keyed by the
//! instruction waiting to run them. Enqueueing to a `None` successor or with
//! an empty batch is silently dropped; that is how terminal sinks absorb
//! finished indices.

use indexmap::IndexMap;

use crate::mask::IndexMask;
use crate::types::InstructionHandle;

/// Pending batches per instruction for one invocation
#[derive(Default)]
pub(crate) struct Scheduler {
    pending: IndexMap<InstructionHandle, Vec<IndexMask>>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enqueues an existing batch for `instruction`
    pub(crate) fn enqueue_mask(&mut self, instruction: Option<InstructionHandle>, mask: IndexMask) {
        let Some(instruction) = instruction else {
            return;
        };
        if mask.is_empty() {
            return;
        }
        self.pending.entry(instruction).or_default().push(mask);
    }

    /// Enqueues an owned index list, as produced by a branch split
    pub(crate) fn enqueue_indices(
        &mut self,
        instruction: Option<InstructionHandle>,
        indices: Vec<usize>,
    ) {
        if indices.is_empty() {
            return;
        }
        self.enqueue_mask(instruction, IndexMask::from_indices(indices));
    }

    /// Removes and returns one pending batch, or `None` when the invocation
    /// is drained.
    ///
    /// Takes the most recently queued instruction's most recently queued
    /// batch. The choice is arbitrary as far as correctness goes; the
    /// depth-first tendency keeps the pending set small. Callers must not
    /// rely on the order.
    pub(crate) fn pop_next(&mut self) -> Option<(InstructionHandle, IndexMask)> {
        let (&instruction, batches) = self.pending.last_mut()?;
        let batch = batches.pop().expect("pending batch lists are never empty");
        if batches.is_empty() {
            self.pending.pop();
        }
        Some((instruction, batch))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total number of indices waiting across all instructions
    #[cfg(test)]
    fn pending_indices(&self) -> usize {
        self.pending
            .values()
            .flat_map(|batches| batches.iter())
            .map(IndexMask::len)
            .sum()
    }
}
