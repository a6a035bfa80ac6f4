/*!
 * Process Table Dump
 * Console rendering of the process table for diagnostics
 */

use crate::process::ProcessInfo;
use crate::scheduler::Kernel;

/// Header plus one line per occupied slot
pub fn render_table(rows: &[ProcessInfo]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<5} {:<6} {:<16} {:<7} {:<9} {:<12} {:>5} {:>5} {:>6} {:>10}",
        "SLOT", "PID", "NAME", "PARENT", "PRIORITY", "STATUS", "KIDS", "LIVE", "JOINS", "CPU"
    )];

    lines.extend(rows.iter().filter(|row| !row.is_empty()).map(|row| {
        let parent = row
            .parent
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{:<5} {:<6} {:<16} {:<7} {:<9} {:<12} {:>5} {:>5} {:>6} {:>10}",
            row.slot,
            row.pid,
            row.name,
            parent,
            row.priority,
            row.status.to_string(),
            row.kids,
            row.live_kids,
            row.joins,
            row.cpu_time
        )
    }));

    lines
}

impl Kernel {
    /// Print the process table to the console
    pub fn dump_processes(&self) {
        for line in render_table(&self.processes()) {
            self.machine().console(line);
        }
    }
}
