/*!
 * Block and Unblock
 * Generic waits whose meaning belongs to a layer above the core
 */

use crate::core::errors::{HaltReason, UnblockError};
use crate::core::types::{Pid, Resumed};
use crate::monitoring::span_primitive;
use crate::process::ProcessStatus;
use crate::scheduler::{Kernel, KernelState};
use tracing::debug;

impl KernelState {
    pub(crate) fn unblock_step(&mut self, pid: Pid) -> Result<(), UnblockError> {
        if self.current_pid() == Some(pid) {
            return Err(UnblockError::SelfUnblock(pid));
        }
        let slot = self.table.find(pid).ok_or(UnblockError::NoSuchProcess(pid))?;
        let status = self.table[slot].status;
        if !status.is_custom_blocked() {
            return Err(UnblockError::NotBlocked {
                pid,
                status: status.code(),
            });
        }
        self.make_ready(slot);
        Ok(())
    }
}

impl Kernel {
    /// Block the caller with a status code above `MEBLOCKED` until some
    /// other process unblocks it. A reserved code halts the machine.
    pub async fn block_me(&self, status: i32) -> Resumed {
        if let Err(halted) = self.require_kernel_mode("block_me") {
            return halted.park().await;
        }
        let Some(blocked) = ProcessStatus::custom(status) else {
            return self
                .fatal(HaltReason::ReservedBlockStatus(status))
                .park()
                .await;
        };
        let span = span_primitive("block_me", self.getpid());

        let slot = {
            let mut cs = self.critical_section();
            cs.block_current(blocked)
        };
        if slot.is_none() {
            return self.fatal(HaltReason::NoCurrentProcess).park().await;
        }

        debug!(status, "Process blocked");
        self.dispatcher().await;

        let resumed = Resumed::from_zapped(self.is_zapped());
        span.record_return(resumed);
        resumed
    }

    /// Make a process blocked in `block_me` ready again and dispatch
    pub async fn unblock_proc(&self, pid: Pid) -> Result<Resumed, UnblockError> {
        if let Err(halted) = self.require_kernel_mode("unblock_proc") {
            return halted.park().await;
        }
        let span = span_primitive("unblock_proc", self.getpid());

        let outcome = {
            let mut cs = self.critical_section();
            cs.unblock_step(pid)
        };
        if let Err(e) = outcome {
            span.record_error(&e);
            return Err(e);
        }

        debug!(unblocked = pid, "Process unblocked");
        self.dispatcher().await;

        let resumed = Resumed::from_zapped(self.is_zapped());
        span.record_return(resumed);
        Ok(resumed)
    }
}
