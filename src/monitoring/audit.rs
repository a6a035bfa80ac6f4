/*!
 * Invariant Audit
 * Consistency checks over the process table and ready queues
 */

use crate::core::limits::SENTINEL_PRIORITY;
use crate::process::{Chain, ProcessStatus};
use crate::scheduler::{Kernel, KernelState};

impl KernelState {
    /// Every broken invariant, described; empty when consistent
    pub(crate) fn audit(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let running: Vec<usize> = self
            .table
            .iter()
            .filter(|(_, pcb)| pcb.status == ProcessStatus::Running)
            .map(|(slot, _)| slot)
            .collect();
        if running.len() > 1 {
            violations.push(format!("{} processes are RUNNING", running.len()));
        }
        if let Some(&slot) = running.first() {
            if self.current != Some(slot) {
                violations.push(format!(
                    "process {} is RUNNING but not current",
                    self.table[slot].pid
                ));
            }
        }

        for (priority, pid) in self.ready.iter() {
            match self.table.find(pid) {
                None => violations.push(format!("queued pid {} does not exist", pid)),
                Some(slot) => {
                    let pcb = &self.table[slot];
                    if pcb.priority != priority {
                        violations.push(format!(
                            "process {} has priority {} but is queued at {}",
                            pid, pcb.priority, priority
                        ));
                    }
                    if !pcb.status.is_schedulable() {
                        violations.push(format!("process {} is queued while {}", pid, pcb.status));
                    }
                }
            }
        }

        for (_, pcb) in self.table.iter() {
            if pcb.status.is_schedulable() && !self.ready.contains(pcb.priority, pcb.pid) {
                violations.push(format!("process {} is {} but not queued", pcb.pid, pcb.status));
            }
        }

        let idle = self
            .table
            .iter()
            .filter(|(_, pcb)| pcb.priority == SENTINEL_PRIORITY)
            .count();
        if idle > 1 {
            violations.push(format!("{} processes hold the idle priority", idle));
        }

        for (slot, pcb) in self.table.iter() {
            let attached = self.table.members(slot, Chain::Children).len();
            if attached != pcb.num_live_kids as usize {
                violations.push(format!(
                    "process {} counts {} live children but has {} attached",
                    pcb.pid, pcb.num_live_kids, attached
                ));
            }
        }

        violations
    }
}

impl Kernel {
    /// Check the table and queue invariants; empty when consistent
    pub fn audit(&self) -> Vec<String> {
        self.inner.state.lock().audit()
    }
}
