/*!
 * Dispatcher
 *
 * Picks the next process and hands it the CPU. The selection runs inside
 * a critical section; the switch itself happens after the section ends,
 * when the caller's future yields to the run loop.
 */

use super::{Kernel, KernelState};
use crate::core::errors::HaltReason;
use crate::core::types::{Pid, Timestamp};
use crate::process::ProcessStatus;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Outcome of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Switch {
    pub(crate) old: Option<Pid>,
    pub(crate) new: Pid,
}

impl KernelState {
    /// First schedulable process, scanning priorities from the most urgent
    /// and each queue from the head
    pub(crate) fn pick_next(&self) -> Option<usize> {
        self.ready.iter().find_map(|(_, pid)| {
            self.table
                .find(pid)
                .filter(|&slot| self.table[slot].status.is_schedulable())
        })
    }

    /// Charge the outgoing process and make the selected one current
    pub(crate) fn select_next(&mut self, now: Timestamp) -> Result<Switch, HaltReason> {
        let next = self.pick_next().ok_or(HaltReason::NoRunnableProcess)?;
        let old = self.current_pid();

        if let Some(slot) = self.current {
            let pcb = &mut self.table[slot];
            if let Some(start) = pcb.start_time.take() {
                pcb.cpu_time += now.saturating_sub(start);
            }
            if slot != next && pcb.status == ProcessStatus::Running {
                pcb.status = ProcessStatus::Ready;
            }
        }

        let pcb = &mut self.table[next];
        pcb.status = ProcessStatus::Running;
        pcb.start_time = Some(now);
        self.current = Some(next);

        Ok(Switch { old, new: pcb.pid })
    }
}

impl Kernel {
    /// Give the CPU to the most urgent ready process.
    ///
    /// Resolves once the caller is selected again. A caller that is no
    /// longer schedulable (blocked or quit) stays suspended until another
    /// process makes it ready; a caller that quit never resumes.
    pub(crate) async fn dispatcher(&self) {
        if let Err(halted) = self.require_kernel_mode("dispatcher") {
            return halted.park().await;
        }

        let now = self.inner.machine.clock().now();
        let selected = {
            let mut cs = self.critical_section();
            cs.select_next(now)
        };

        match selected {
            Ok(switch) => {
                if switch.old != Some(switch.new) {
                    trace!(old = ?switch.old, new = switch.new, at = now, "Context switch");
                }
                self.inner.hooks.on_switch(switch.old, switch.new);
                ContextSwitch {
                    kernel: self,
                    resume: switch.old,
                }
                .await
            }
            Err(reason) => self.fatal(reason).park().await,
        }
    }
}

/// Suspends the caller until it is current again
struct ContextSwitch<'a> {
    kernel: &'a Kernel,
    resume: Option<Pid>,
}

impl Future for ContextSwitch<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.kernel.inner.machine.is_halted() {
            return Poll::Pending;
        }
        match self.resume {
            Some(pid) if self.kernel.current_pid() == Some(pid) => Poll::Ready(()),
            _ => Poll::Pending,
        }
    }
}
