/*!
 * Process Types
 * Lifecycle status, process control block and table snapshots
 */

use crate::core::limits::MEBLOCKED;
use crate::core::types::{ExitCode, Pid, Priority, ProcName, Timestamp};
use crate::hardware::ExecContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Slot holds no process
    Empty,
    /// Eligible to run
    Ready,
    /// On the CPU (exactly one process)
    Running,
    /// Waiting in join for a child to quit
    JoinBlocked,
    /// Waiting in zap for the target to quit
    ZapBlocked,
    /// Terminated, exit status not yet collected
    Quit,
    /// Blocked through block_me with a caller-defined code above `MEBLOCKED`
    Blocked(i32),
}

impl ProcessStatus {
    /// Numeric status as shown in the table dump
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            ProcessStatus::Empty => 0,
            ProcessStatus::Ready => 1,
            ProcessStatus::Running => 2,
            ProcessStatus::JoinBlocked => 3,
            ProcessStatus::ZapBlocked => 4,
            ProcessStatus::Quit => 5,
            ProcessStatus::Blocked(code) => code,
        }
    }

    /// Status for a block_me code, if the code is outside the reserved range
    #[must_use]
    pub const fn custom(code: i32) -> Option<Self> {
        if code > MEBLOCKED {
            Some(ProcessStatus::Blocked(code))
        } else {
            None
        }
    }

    /// Check if the dispatcher may select a process in this status
    ///
    /// # Performance
    /// Hot path - checked for every ready-queue entry on dispatch
    #[inline(always)]
    #[must_use]
    pub const fn is_schedulable(self) -> bool {
        matches!(self, ProcessStatus::Ready | ProcessStatus::Running)
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(
            self,
            ProcessStatus::JoinBlocked | ProcessStatus::ZapBlocked | ProcessStatus::Blocked(_)
        )
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_custom_blocked(self) -> bool {
        matches!(self, ProcessStatus::Blocked(_))
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Empty => f.write_str("EMPTY"),
            ProcessStatus::Ready => f.write_str("READY"),
            ProcessStatus::Running => f.write_str("RUNNING"),
            ProcessStatus::JoinBlocked => f.write_str("JOINBLOCKED"),
            ProcessStatus::ZapBlocked => f.write_str("ZAPBLOCKED"),
            ProcessStatus::Quit => f.write_str("QUIT"),
            ProcessStatus::Blocked(code) => write!(f, "{}", code),
        }
    }
}

/// Process control block
///
/// Relationship links are slot indices into the owning `ProcessTable`.
/// `parent` is a back-reference; the three heads (`first_child`,
/// `quit_head`, `zapper_head`) start chains threaded through the
/// `next_sibling`, `quit_next` and `zapper_next` links of other slots.
#[derive(Debug)]
pub struct Pcb {
    pub(crate) pid: Pid,
    pub(crate) name: ProcName,
    pub(crate) priority: Priority,
    pub(crate) status: ProcessStatus,
    pub(crate) context: Option<ExecContext>,
    pub(crate) start_arg: String,
    pub(crate) stack_size: usize,

    pub(crate) parent: Option<usize>,
    pub(crate) first_child: Option<usize>,
    pub(crate) next_sibling: Option<usize>,
    pub(crate) quit_head: Option<usize>,
    pub(crate) quit_next: Option<usize>,
    pub(crate) zapper_head: Option<usize>,
    pub(crate) zapper_next: Option<usize>,

    pub(crate) num_kids: u32,
    pub(crate) num_live_kids: u32,
    pub(crate) num_joins: u32,
    pub(crate) cpu_time: u64,
    pub(crate) start_time: Option<Timestamp>,

    pub(crate) zapped: bool,
    pub(crate) quit_status: Option<ExitCode>,
}

impl Pcb {
    /// A READY process with no relationships and no context bound yet
    #[must_use]
    pub fn new(pid: Pid, name: &str, priority: Priority) -> Self {
        Self {
            pid,
            name: ProcName::from(name),
            priority,
            status: ProcessStatus::Ready,
            context: None,
            start_arg: String::new(),
            stack_size: 0,
            parent: None,
            first_child: None,
            next_sibling: None,
            quit_head: None,
            quit_next: None,
            zapper_head: None,
            zapper_next: None,
            num_kids: 0,
            num_live_kids: 0,
            num_joins: 0,
            cpu_time: 0,
            start_time: None,
            zapped: false,
            quit_status: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ExecContext, arg: String) -> Self {
        self.stack_size = context.stack_size();
        self.context = Some(context);
        self.start_arg = arg;
        self
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    #[inline]
    pub fn is_zapped(&self) -> bool {
        self.zapped
    }
}

/// Read-only view of one table slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub slot: usize,
    pub pid: Pid,
    pub name: String,
    pub parent: Option<Pid>,
    pub priority: Priority,
    pub status: ProcessStatus,
    pub kids: u32,
    pub live_kids: u32,
    pub joins: u32,
    pub cpu_time: u64,
    pub zapped: bool,
    pub stack_size: usize,
    pub start_arg: String,
    pub quit_status: Option<ExitCode>,
}

impl ProcessInfo {
    /// Row for an unused slot
    #[must_use]
    pub fn empty(slot: usize) -> Self {
        Self {
            slot,
            pid: 0,
            name: String::new(),
            parent: None,
            priority: 0,
            status: ProcessStatus::Empty,
            kids: 0,
            live_kids: 0,
            joins: 0,
            cpu_time: 0,
            zapped: false,
            stack_size: 0,
            start_arg: String::new(),
            quit_status: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.status, ProcessStatus::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProcessStatus::Empty.code(), 0);
        assert_eq!(ProcessStatus::Quit.code(), 5);
        assert_eq!(ProcessStatus::Blocked(42).code(), 42);
    }

    #[test]
    fn test_custom_status_threshold() {
        assert_eq!(ProcessStatus::custom(10), None);
        assert_eq!(ProcessStatus::custom(11), Some(ProcessStatus::Blocked(11)));
    }

    #[test]
    fn test_schedulable() {
        assert!(ProcessStatus::Ready.is_schedulable());
        assert!(ProcessStatus::Running.is_schedulable());
        assert!(!ProcessStatus::JoinBlocked.is_schedulable());
        assert!(!ProcessStatus::Blocked(20).is_schedulable());
        assert!(ProcessStatus::Blocked(20).is_blocked());
        assert!(!ProcessStatus::Quit.is_blocked());
    }

    #[test]
    fn test_display() {
        assert_eq!(ProcessStatus::JoinBlocked.to_string(), "JOINBLOCKED");
        assert_eq!(ProcessStatus::Blocked(13).to_string(), "13");
    }
}
