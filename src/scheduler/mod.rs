/*!
 * Scheduler Module
 *
 * The kernel handle and the machinery that moves the CPU between
 * processes: the dispatcher, the clock-driven preemption hook, the run
 * loop that plays the role of the context-switch hardware, the launch
 * trampoline and the idle process.
 *
 * ## Architecture
 *
 * Every process body is a boxed future. A context switch is the running
 * future returning `Pending` to the run loop, which then polls the
 * process the dispatcher selected. Only the current process is ever
 * polled, so at any instant exactly one process body makes progress.
 */

mod builder;
pub(crate) mod dispatcher;
mod preemption;
pub(crate) mod runner;
mod sentinel;

pub use builder::KernelBuilder;

use crate::core::config::KernelConfig;
use crate::core::errors::HaltReason;
use crate::core::guard::CriticalSection;
use crate::core::limits::FATAL_EXIT_CODE;
use crate::core::types::{Pid, Priority};
use crate::hardware::{HaltReport, Halted, Machine};
use crate::process::{KernelHooks, ProcessInfo, ProcessStatus, ProcessTable, ReadyQueues};
use parking_lot::Mutex;
use std::sync::Arc;

/// Handle to the single kernel instance. Cloning is cheap; every clone
/// refers to the same process table and machine.
#[derive(Clone)]
pub struct Kernel {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: KernelConfig,
    pub(crate) machine: Machine,
    pub(crate) state: Mutex<KernelState>,
    pub(crate) hooks: Arc<dyn KernelHooks>,
}

/// Shared mutable state: only touched inside a critical section
pub(crate) struct KernelState {
    pub(crate) table: ProcessTable,
    pub(crate) ready: ReadyQueues,
    /// Slot of the RUNNING process
    pub(crate) current: Option<usize>,
    pub(crate) started: bool,
}

impl KernelState {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            table: ProcessTable::new(capacity),
            ready: ReadyQueues::new(),
            current: None,
            started: false,
        }
    }

    #[inline]
    pub(crate) fn current_pid(&self) -> Option<Pid> {
        self.current
            .and_then(|slot| self.table.get(slot))
            .map(|pcb| pcb.pid)
    }

    /// Take `slot` off its ready queue, if it is on one
    pub(crate) fn dequeue(&mut self, slot: usize) {
        let (priority, pid) = (self.table[slot].priority, self.table[slot].pid);
        self.ready.remove(priority, pid);
    }

    /// Mark `slot` READY and append it to its queue unless already queued
    pub(crate) fn make_ready(&mut self, slot: usize) {
        let pcb = &mut self.table[slot];
        pcb.status = ProcessStatus::Ready;
        let (priority, pid) = (pcb.priority, pcb.pid);
        if !self.ready.contains(priority, pid) {
            self.ready.push_back(priority, pid);
        }
    }

    /// Block the current process with `status` and take it off its queue
    pub(crate) fn block_current(&mut self, status: ProcessStatus) -> Option<usize> {
        let slot = self.current?;
        self.table[slot].status = status;
        self.dequeue(slot);
        Some(slot)
    }
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    /// Kernel with the default configuration and no hooks
    pub fn new() -> Self {
        KernelBuilder::new().assemble()
    }

    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    #[inline]
    pub fn machine(&self) -> &Machine {
        &self.inner.machine
    }

    /// Mask interrupts and lock the kernel state
    #[inline]
    pub(crate) fn critical_section(&self) -> CriticalSection<'_, KernelState> {
        CriticalSection::enter(&self.inner.machine, &self.inner.state)
    }

    /// Halt the machine with the fatal exit code
    pub(crate) fn fatal(&self, reason: HaltReason) -> Halted {
        self.inner.machine.console(format!("FATAL: {}", reason));
        self.inner.machine.halt(FATAL_EXIT_CODE, reason)
    }

    /// Every primitive starts here; user mode halts the machine
    pub(crate) fn require_kernel_mode(&self, op: &'static str) -> Result<(), Halted> {
        if self.inner.machine.is_kernel_mode() {
            return Ok(());
        }
        let pid = self.current_pid();
        Err(self.fatal(HaltReason::UserMode { op, pid }))
    }

    #[inline]
    pub(crate) fn current_pid(&self) -> Option<Pid> {
        self.inner.state.lock().current_pid()
    }

    /// Pid of the running process, 0 outside any process
    pub fn getpid(&self) -> Pid {
        self.current_pid().unwrap_or(0)
    }

    /// Whether some other process has zapped the caller
    pub fn is_zapped(&self) -> bool {
        let state = self.inner.state.lock();
        state
            .current
            .and_then(|slot| state.table.get(slot))
            .is_some_and(|pcb| pcb.zapped)
    }

    /// Number of processes that exist and have not quit
    pub fn count_processes(&self) -> usize {
        self.inner.state.lock().table.count_live()
    }

    /// Snapshot of every slot, empty ones included
    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.inner.state.lock().table.snapshot()
    }

    /// Snapshot of one process
    pub fn process(&self, pid: Pid) -> Option<ProcessInfo> {
        let state = self.inner.state.lock();
        state.table.find(pid).map(|slot| state.table.info(slot))
    }

    /// Pids queued at `priority`, head first
    pub fn ready_queue(&self, priority: Priority) -> Vec<Pid> {
        self.inner.state.lock().ready.queue(priority)
    }

    pub fn halt_report(&self) -> Option<HaltReport> {
        self.inner.machine.halt_report()
    }

    /// Console output so far
    pub fn transcript(&self) -> Vec<String> {
        self.inner.machine.transcript()
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (current, processes, ready) = {
            let state = self.inner.state.lock();
            (state.current_pid(), state.table.len(), state.ready.len())
        };
        f.debug_struct("Kernel")
            .field("config", &self.inner.config)
            .field("current", &current)
            .field("processes", &processes)
            .field("ready", &ready)
            .field("halted", &self.inner.machine.is_halted())
            .finish()
    }
}
