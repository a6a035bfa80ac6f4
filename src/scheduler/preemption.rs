/*!
 * Preemption
 *
 * Clock interrupts, quantum enforcement and the processor-state
 * primitives. Interrupts are only delivered at two points: while a
 * process executes simulated work and while the idle process waits.
 */

use super::{Kernel, KernelState};
use crate::core::types::Timestamp;
use crate::hardware::{Interrupt, Mode, Psr, PsrError};
use tracing::{debug, warn};

impl KernelState {
    /// Rotate the current process to the tail of its queue if it has used
    /// up its quantum. Returns whether the quantum expired.
    pub(crate) fn expire_quantum(&mut self, now: Timestamp, quantum: u64) -> bool {
        let Some(slot) = self.current else {
            return false;
        };
        let pcb = &self.table[slot];
        let Some(start) = pcb.start_time else {
            return false;
        };
        if now.saturating_sub(start) < quantum {
            return false;
        }
        let (priority, pid) = (pcb.priority, pcb.pid);
        self.ready.rotate_to_back(priority, pid);
        true
    }
}

impl Kernel {
    /// Current clock value in microseconds
    #[inline]
    pub fn read_time(&self) -> Timestamp {
        self.inner.machine.clock().now()
    }

    /// When the running process started its current quantum
    pub fn read_cur_start_time(&self) -> Option<Timestamp> {
        let state = self.inner.state.lock();
        state
            .current
            .and_then(|slot| state.table.get(slot))
            .and_then(|pcb| pcb.start_time)
    }

    /// Quantum check: dispatch if the running process has used its quantum
    pub async fn time_slice(&self) {
        if let Err(halted) = self.require_kernel_mode("time_slice") {
            return halted.park().await;
        }

        let now = self.read_time();
        let expired = {
            let mut cs = self.critical_section();
            cs.expire_quantum(now, self.inner.config.quantum_us)
        };

        if expired {
            debug!(pid = self.getpid(), at = now, "Quantum expired");
            self.dispatcher().await;
        }
    }

    /// Raise an interrupt. The handler runs in kernel mode with interrupts
    /// disabled; the interrupted status register is restored afterwards.
    pub async fn interrupt(&self, irq: Interrupt) {
        let machine = &self.inner.machine;
        let saved = machine.psr();
        machine.set_psr(Psr::HANDLER);

        match irq {
            Interrupt::Clock => self.time_slice().await,
            Interrupt::Illegal => {
                warn!(pid = self.getpid(), "Illegal instruction trapped, continuing")
            }
        }

        machine.set_psr(saved);
    }

    /// Run `micros` microseconds of simulated work, taking clock
    /// interrupts as they fall due
    pub async fn execute(&self, micros: u64) {
        let machine = &self.inner.machine;
        let clock = machine.clock();
        let mut remaining = micros;

        loop {
            if clock.tick_pending() && machine.interrupts_enabled() {
                clock.acknowledge();
                self.interrupt(Interrupt::Clock).await;
            }
            if remaining == 0 {
                break;
            }
            remaining -= clock.advance(remaining);
        }
    }

    /// Idle until the next clock interrupt and take it
    pub async fn wait_interrupt(&self) {
        let machine = &self.inner.machine;
        let clock = machine.clock();
        clock.wait_for_tick();

        if machine.interrupts_enabled() {
            clock.acknowledge();
            self.interrupt(Interrupt::Clock).await;
        }
    }

    pub fn enable_interrupts(&self) -> Result<(), PsrError> {
        self.inner.machine.set_interrupts(true).map(|_| ())
    }

    pub fn disable_interrupts(&self) -> Result<(), PsrError> {
        self.inner.machine.set_interrupts(false).map(|_| ())
    }

    /// Drop the running process to user mode
    pub fn enter_user_mode(&self) {
        let machine = &self.inner.machine;
        machine.set_psr(machine.psr().with_mode(Mode::User));
        debug!(pid = self.getpid(), "Entered user mode");
    }

    pub fn enter_kernel_mode(&self) {
        let machine = &self.inner.machine;
        machine.set_psr(machine.psr().with_mode(Mode::Kernel));
        debug!(pid = self.getpid(), "Entered kernel mode");
    }
}
