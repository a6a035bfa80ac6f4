/*!
 * Process Module
 * Process control blocks, the process table and the ready queues
 */

pub mod hooks;
pub mod ready;
pub mod table;
pub mod types;

// Re-export for convenience
pub use hooks::{KernelHooks, NoopHooks};
pub use ready::ReadyQueues;
pub use table::{Chain, ProcessTable};
pub use types::{Pcb, ProcessInfo, ProcessStatus};
