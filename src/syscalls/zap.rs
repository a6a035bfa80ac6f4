/*!
 * Zap
 * Ask another process to quit and wait until it has
 */

use crate::core::errors::HaltReason;
use crate::core::types::{Pid, Resumed};
use crate::monitoring::span_primitive;
use crate::process::{Chain, ProcessStatus};
use crate::scheduler::{Kernel, KernelState};
use tracing::debug;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ZapStep {
    /// Target had already quit
    Done(Resumed),
    /// Caller is now ZAPBLOCKED on the target
    Block,
    Fatal(HaltReason),
}

impl KernelState {
    pub(crate) fn zap_step(&mut self, target: Pid) -> ZapStep {
        let Some(me) = self.current else {
            return ZapStep::Fatal(HaltReason::NoCurrentProcess);
        };
        if self.table[me].pid == target {
            return ZapStep::Fatal(HaltReason::SelfZap(target));
        }
        let Some(slot) = self.table.find(target) else {
            return ZapStep::Fatal(HaltReason::ZapTargetMissing(target));
        };

        if self.table[slot].status == ProcessStatus::Quit {
            return ZapStep::Done(Resumed::from_zapped(self.table[me].zapped));
        }

        self.table[slot].zapped = true;
        self.table.push_back(slot, Chain::Zappers, me);
        self.block_current(ProcessStatus::ZapBlocked);
        ZapStep::Block
    }
}

impl Kernel {
    /// Mark `pid` as zapped and wait for it to quit.
    ///
    /// Zapping a process that has already quit returns at once. Naming the
    /// caller or a pid that does not exist halts the machine.
    pub async fn zap(&self, pid: Pid) -> Resumed {
        if let Err(halted) = self.require_kernel_mode("zap") {
            return halted.park().await;
        }
        let span = span_primitive("zap", self.getpid());

        let step = {
            let mut cs = self.critical_section();
            cs.zap_step(pid)
        };

        let resumed = match step {
            ZapStep::Done(resumed) => resumed,
            ZapStep::Block => {
                debug!(zapped = pid, "Waiting for zapped process to quit");
                self.dispatcher().await;
                Resumed::from_zapped(self.is_zapped())
            }
            ZapStep::Fatal(reason) => return self.fatal(reason).park().await,
        };
        span.record_return(resumed);
        resumed
    }
}
