/*!
 * Simulated Kernel Library
 * Process management core of a single-CPU kernel on simulated hardware
 */

pub mod core;
pub mod hardware;
pub mod monitoring;
pub mod process;
pub mod scheduler;
pub mod syscalls;

// Re-exports
pub use crate::core::{
    ConfigError, ExitCode, ForkError, HaltReason, JoinError, Joined, KernelConfig, KernelError,
    Pid, Priority, Resumed, Timestamp, UnblockError,
};
pub use hardware::{HaltReport, Interrupt, Machine, Mode, Psr, PsrError};
pub use monitoring::{init_tracing, render_table};
pub use process::{KernelHooks, NoopHooks, ProcessInfo, ProcessStatus};
pub use scheduler::{Kernel, KernelBuilder};
