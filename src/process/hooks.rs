/*!
 * Kernel Hooks
 * Observation points for subsystems layered above the process core
 */

use crate::core::types::Pid;

/// Callbacks invoked on process lifecycle events.
///
/// Hooks run with the process table unlocked and interrupts in the state
/// of the calling primitive. They must not call back into blocking kernel
/// primitives.
pub trait KernelHooks: Send + Sync {
    /// A process was created and queued
    fn on_fork(&self, _pid: Pid) {}

    /// A process quit; its status is waiting for the parent
    fn on_quit(&self, _pid: Pid) {}

    /// The dispatcher handed the CPU from `old` to `new`
    fn on_switch(&self, _old: Option<Pid>, _new: Pid) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl KernelHooks for NoopHooks {}
