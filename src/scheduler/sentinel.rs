/*!
 * Idle Process
 * Runs when nothing else can and decides how the machine stops
 */

use super::{Kernel, KernelState};
use crate::core::errors::HaltReason;
use crate::core::types::{ExitCode, Pid};
use crate::process::ProcessStatus;

/// What the idle process sees when it looks at the rest of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Census {
    /// A process that could run, if any
    pub(crate) runnable: Option<Pid>,
    /// Processes waiting on join, zap or block_me
    pub(crate) blocked: usize,
    /// Processes that have not quit, the idle process included
    pub(crate) live: usize,
}

impl KernelState {
    /// Survey every process except the current one
    pub(crate) fn census(&self) -> Census {
        let mut census = Census {
            runnable: None,
            blocked: 0,
            live: self.table.count_live(),
        };
        for (slot, pcb) in self.table.iter() {
            if Some(slot) == self.current {
                continue;
            }
            match pcb.status {
                ProcessStatus::Ready | ProcessStatus::Running => {
                    census.runnable.get_or_insert(pcb.pid);
                }
                status if status.is_blocked() => census.blocked += 1,
                _ => {}
            }
        }
        census
    }
}

impl Kernel {
    /// Built-in idle body
    pub(crate) async fn sentinel(self) -> ExitCode {
        loop {
            self.check_deadlock().await;
            self.wait_interrupt().await;
        }
    }

    /// Stop the machine once the idle process is the only thing that can
    /// run: cleanly if every other process has quit, with the fatal code
    /// if some are still blocked. Never returns.
    pub async fn check_deadlock(&self) {
        if let Err(halted) = self.require_kernel_mode("check_deadlock") {
            return halted.park().await;
        }

        let census = {
            let cs = self.critical_section();
            cs.census()
        };

        if let Some(pid) = census.runnable {
            return self.fatal(HaltReason::IdleWhileRunnable(pid)).park().await;
        }

        let machine = &self.inner.machine;
        if census.blocked > 0 {
            machine.console(format!(
                "check_deadlock(): {} processes remain, only the idle process should be left. Halting...",
                census.live
            ));
            return self
                .fatal(HaltReason::Deadlock {
                    blocked: census.blocked,
                })
                .park()
                .await;
        }

        machine.console("All processes completed.");
        machine.halt(0, HaltReason::Completed).park().await
    }
}
