/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 *
 * Two tiers: recoverable errors are returned to the calling process and
 * carry the legacy negative code through `legacy_code()`; `HaltReason` describes
 * the unrecoverable conditions that stop the whole machine.
 */

use super::types::{Pid, Priority};
use miette::Diagnostic;
use thiserror::Error;

/// Fork failures
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ForkError {
    #[error("Process name is missing")]
    #[diagnostic(code(fork::name_missing), help("Every process needs a non-empty name."))]
    NameMissing,

    #[error("Process name is {len} bytes, limit is {limit}")]
    #[diagnostic(code(fork::name_too_long))]
    NameTooLong { len: usize, limit: usize },

    #[error("Start argument is {len} bytes, limit is {limit}")]
    #[diagnostic(code(fork::arg_too_long))]
    ArgTooLong { len: usize, limit: usize },

    #[error("Priority {0} out of range")]
    #[diagnostic(
        code(fork::priority_out_of_range),
        help("Ordinary processes use priorities 1 (most urgent) through 5.")
    )]
    PriorityOutOfRange(Priority),

    #[error("Priority {0} is reserved for the idle process")]
    #[diagnostic(code(fork::reserved_priority))]
    ReservedPriority(Priority),

    #[error("Stack of {requested} bytes is below the minimum of {minimum}")]
    #[diagnostic(code(fork::stack_too_small))]
    StackTooSmall { requested: usize, minimum: usize },

    #[error("Could not allocate a stack of {requested} bytes")]
    #[diagnostic(code(fork::stack_unavailable))]
    StackUnavailable { requested: usize },

    #[error("Process table is full ({capacity} slots)")]
    #[diagnostic(
        code(fork::table_full),
        help("Join quit children to release their slots.")
    )]
    TableFull { capacity: usize },
}

impl ForkError {
    /// Legacy return code (-2 for an undersized stack, -1 otherwise)
    #[must_use]
    pub const fn legacy_code(&self) -> i32 {
        match self {
            ForkError::StackTooSmall { .. } => -2,
            _ => -1,
        }
    }
}

/// Join failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum JoinError {
    #[error("Process has no children")]
    #[diagnostic(code(join::no_children))]
    NoChildren,

    #[error("All {0} children have already been joined")]
    #[diagnostic(code(join::already_joined_all))]
    AlreadyJoinedAll(u32),
}

impl JoinError {
    #[must_use]
    pub const fn legacy_code(&self) -> i32 {
        -2
    }
}

/// unblock_proc failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum UnblockError {
    #[error("Process {0} cannot unblock itself")]
    #[diagnostic(code(unblock::self_unblock))]
    SelfUnblock(Pid),

    #[error("Process {0} does not exist")]
    #[diagnostic(code(unblock::no_such_process))]
    NoSuchProcess(Pid),

    #[error("Process {pid} has status {status}, not a block_me status")]
    #[diagnostic(
        code(unblock::not_blocked),
        help("Only processes blocked through block_me can be unblocked.")
    )]
    NotBlocked { pid: Pid, status: i32 },
}

impl UnblockError {
    #[must_use]
    pub const fn legacy_code(&self) -> i32 {
        -2
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { field: &'static str, reason: String },

    #[error("Environment variable {var} is not a number: {value:?}")]
    #[diagnostic(code(config::bad_env))]
    BadEnv { var: &'static str, value: String },

    #[error("Failed to parse configuration: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(String),
}

/// Reasons the machine halts
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum HaltReason {
    #[error("All processes completed")]
    #[diagnostic(code(halt::completed))]
    Completed,

    #[error("Deadlock: {blocked} processes blocked with nothing left to run")]
    #[diagnostic(code(halt::deadlock))]
    Deadlock { blocked: usize },

    #[error("Idle process ran while process {0} was still runnable")]
    #[diagnostic(code(halt::idle_inconsistency))]
    IdleWhileRunnable(Pid),

    #[error("{op}() called while in user mode by process {pid:?}")]
    #[diagnostic(
        code(halt::user_mode),
        help("Kernel primitives may only be called in kernel mode.")
    )]
    UserMode { op: &'static str, pid: Option<Pid> },

    #[error("Process {pid} quit with active child {child}")]
    #[diagnostic(
        code(halt::live_children),
        help("Join every child before quitting.")
    )]
    QuitWithLiveChildren { pid: Pid, child: Pid },

    #[error("Process {pid} not found among the children of its parent {parent}")]
    #[diagnostic(code(halt::orphaned_child))]
    MissingFromParent { pid: Pid, parent: Pid },

    #[error("Dispatcher found no runnable process")]
    #[diagnostic(
        code(halt::no_runnable),
        help("The idle process must always be ready.")
    )]
    NoRunnableProcess,

    #[error("Run loop has no current process to resume")]
    #[diagnostic(code(halt::no_current))]
    NoCurrentProcess,

    #[error("Failed to update the status register in {0}()")]
    #[diagnostic(code(halt::invalid_psr))]
    InvalidPsr(&'static str),

    #[error("Process {0} tried to zap itself")]
    #[diagnostic(code(halt::self_zap))]
    SelfZap(Pid),

    #[error("Zapped process {0} does not exist")]
    #[diagnostic(code(halt::zap_missing))]
    ZapTargetMissing(Pid),

    #[error("block_me status {0} is reserved (must be above 10)")]
    #[diagnostic(code(halt::reserved_status))]
    ReservedBlockStatus(i32),

    #[error("Boot failed to fork {name}: {source}")]
    #[diagnostic(code(halt::boot_failed))]
    BootFailed {
        name: &'static str,
        #[source]
        source: ForkError,
    },

    #[error("Kernel has already been started")]
    #[diagnostic(code(halt::already_started))]
    AlreadyStarted,
}

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Fork error: {0}")]
    #[diagnostic(transparent)]
    Fork(#[from] ForkError),

    #[error("Join error: {0}")]
    #[diagnostic(transparent)]
    Join(#[from] JoinError),

    #[error("Unblock error: {0}")]
    #[diagnostic(transparent)]
    Unblock(#[from] UnblockError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Machine halted with code {code}: {reason}")]
    #[diagnostic(code(kernel::halted))]
    Halted { code: i32, reason: HaltReason },
}
