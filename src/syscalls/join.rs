/*!
 * Join and Quit
 *
 * A quitting child moves from its parent's children chain onto the
 * parent's quit chain; join takes children off the quit chain in the
 * order they quit and frees their slots.
 */

use crate::core::errors::{HaltReason, JoinError};
use crate::core::types::{ExitCode, Joined, Pid, Resumed, Timestamp};
use crate::monitoring::span_primitive;
use crate::process::{Chain, ProcessStatus};
use crate::scheduler::{Kernel, KernelState};
use tracing::{debug, info};

/// One pass of join under the critical section
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum JoinStep {
    Collected(Joined),
    Failed(JoinError),
    /// Nothing has quit yet; the caller is now JOINBLOCKED
    Block,
    Fatal(HaltReason),
}

impl KernelState {
    pub(crate) fn join_step(&mut self, waited: bool) -> JoinStep {
        let Some(me) = self.current else {
            return JoinStep::Fatal(HaltReason::NoCurrentProcess);
        };

        if !waited {
            let pcb = &self.table[me];
            if pcb.num_kids == 0 && pcb.quit_head.is_none() {
                return JoinStep::Failed(JoinError::NoChildren);
            }
            if pcb.num_joins >= pcb.num_kids {
                return JoinStep::Failed(JoinError::AlreadyJoinedAll(pcb.num_kids));
            }
        }

        let Some(child) = self.table.pop_front(me, Chain::Quit) else {
            self.block_current(ProcessStatus::JoinBlocked);
            return JoinStep::Block;
        };

        let (pid, status) = (self.table[child].pid, self.table[child].quit_status.unwrap_or_default());
        self.reclaim(child);

        let pcb = &mut self.table[me];
        pcb.num_joins += 1;
        JoinStep::Collected(Joined {
            pid,
            status,
            resumed: Resumed::from_zapped(pcb.zapped),
        })
    }

    /// Return a slot to EMPTY
    pub(crate) fn reclaim(&mut self, slot: usize) {
        if let Some(pcb) = self.table.get(slot) {
            let (priority, pid) = (pcb.priority, pcb.pid);
            self.ready.remove(priority, pid);
        }
        self.table.remove(slot);
    }

    /// Retire the current process with `status`. Returns its pid.
    pub(crate) fn quit_current(&mut self, status: ExitCode, now: Timestamp) -> Result<Pid, HaltReason> {
        let me = self.current.ok_or(HaltReason::NoCurrentProcess)?;
        let pid = self.table[me].pid;

        let live_child = self
            .table
            .members(me, Chain::Children)
            .into_iter()
            .find(|&child| self.table[child].status != ProcessStatus::Quit);
        if let Some(child) = live_child {
            return Err(HaltReason::QuitWithLiveChildren {
                pid,
                child: self.table[child].pid,
            });
        }

        let parent = self.table[me].parent;
        if let Some(parent) = parent {
            if !self.table.unlink(parent, Chain::Children, me) {
                return Err(HaltReason::MissingFromParent {
                    pid,
                    parent: self.table[parent].pid,
                });
            }
            let p = &mut self.table[parent];
            p.num_live_kids = p.num_live_kids.saturating_sub(1);
            self.table.push_back(parent, Chain::Quit, me);
            if self.table[parent].status == ProcessStatus::JoinBlocked {
                self.make_ready(parent);
            }
        }

        // Quit children nobody will join now
        for child in self.table.drain(me, Chain::Children) {
            self.reclaim(child);
        }
        for child in self.table.drain(me, Chain::Quit) {
            self.reclaim(child);
        }

        for zapper in self.table.drain(me, Chain::Zappers) {
            if self.table[zapper].status == ProcessStatus::ZapBlocked {
                self.make_ready(zapper);
            }
        }

        let pcb = &mut self.table[me];
        pcb.status = ProcessStatus::Quit;
        pcb.quit_status = Some(status);
        if let Some(start) = pcb.start_time.take() {
            pcb.cpu_time += now.saturating_sub(start);
        }
        self.dequeue(me);
        self.current = None;

        if parent.is_none() {
            self.reclaim(me);
        }
        Ok(pid)
    }
}

impl Kernel {
    /// Wait for a child to quit and collect its exit status.
    ///
    /// Children are collected in the order they quit. `resumed` is
    /// `Zapped` if the caller was zapped by the time it returns.
    pub async fn join(&self) -> Result<Joined, JoinError> {
        if let Err(halted) = self.require_kernel_mode("join") {
            return halted.park().await;
        }
        let span = span_primitive("join", self.getpid());

        let mut waited = false;
        loop {
            let step = {
                let mut cs = self.critical_section();
                cs.join_step(waited)
            };

            match step {
                JoinStep::Collected(joined) => {
                    debug!(child = joined.pid, status = joined.status, "Joined child");
                    span.record_return(joined.pid);
                    return Ok(joined);
                }
                JoinStep::Failed(err) => {
                    span.record_error(&err);
                    return Err(err);
                }
                JoinStep::Block => {
                    waited = true;
                    self.dispatcher().await;
                }
                JoinStep::Fatal(reason) => return self.fatal(reason).park().await,
            }
        }
    }

    /// Terminate the running process with `status`. Never returns; the
    /// return type lets an entry function end with
    /// `return kernel.quit(status).await`.
    pub async fn quit(&self, status: ExitCode) -> ExitCode {
        self.terminate(status).await
    }

    pub(crate) async fn terminate<T>(&self, status: ExitCode) -> T {
        if let Err(halted) = self.require_kernel_mode("quit") {
            return halted.park().await;
        }

        let now = self.read_time();
        let outcome = {
            let mut cs = self.critical_section();
            cs.quit_current(status, now)
        };

        match outcome {
            Ok(pid) => {
                info!(pid, status, "Process quit");
                self.inner.hooks.on_quit(pid);
                self.dispatcher().await;
            }
            Err(reason) => {
                let _ = self.fatal(reason);
            }
        }
        std::future::pending().await
    }
}
