/*!
 * Execution Contexts
 *
 * A context is what the CPU needs to resume a process: its stack, its saved
 * status register and the suspended task running on that stack. Tasks are
 * cooperative; a task hands the CPU back by returning `Pending` to the
 * machine's run loop.
 */

use super::psr::Psr;
use futures::future::BoxFuture;
use std::collections::TryReserveError;
use std::convert::Infallible;
use std::fmt;

/// Suspended body of a process. It never completes: every process leaves
/// the CPU for good through quit.
pub type Task = BoxFuture<'static, Infallible>;

pub struct ExecContext {
    stack: Box<[u8]>,
    psr: Psr,
    task: Option<Task>,
}

impl ExecContext {
    /// Bind a fresh stack of `stack_size` bytes to `task`. Fails instead of
    /// aborting when the host cannot provide the memory.
    pub fn new(stack_size: usize, task: Task) -> Result<Self, TryReserveError> {
        let mut stack = Vec::new();
        stack.try_reserve_exact(stack_size)?;
        stack.resize(stack_size, 0u8);
        Ok(Self {
            stack: stack.into_boxed_slice(),
            psr: Psr::BOOT,
            task: Some(task),
        })
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn psr(&self) -> Psr {
        self.psr
    }

    /// Take the task out for a time slice
    #[inline]
    pub fn take_task(&mut self) -> Option<Task> {
        self.task.take()
    }

    /// Save the task and status register when the slice ends
    #[inline]
    pub fn save(&mut self, task: Task, psr: Psr) {
        self.task = Some(task);
        self.psr = psr;
    }

    #[inline]
    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }
}

impl fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecContext")
            .field("stack_size", &self.stack.len())
            .field("psr", &self.psr)
            .field("has_task", &self.task.is_some())
            .finish()
    }
}
