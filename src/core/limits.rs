/*!
 * System Limits and Constants
 *
 * Centralized location for the fixed limits of the process core.
 * Values that a deployment may tune (table size, quantum, clock period,
 * minimum stack) live in `KernelConfig` and only their defaults are here.
 */

use super::types::Priority;

// =============================================================================
// PROCESS TABLE
// =============================================================================

/// Default number of process table slots
pub const DEFAULT_MAX_PROC: usize = 50;

/// Longest process name accepted by fork (room for a terminator in the
/// fixed-width table field)
pub const MAX_NAME_LEN: usize = 48;

/// Longest start argument accepted by fork
pub const MAX_ARG_LEN: usize = 98;

/// Name given to the idle process
pub const SENTINEL_NAME: &str = "sentinel";

// =============================================================================
// PRIORITIES
// =============================================================================

/// Highest scheduling priority (smallest number)
pub const MAX_PRIORITY: Priority = 1;

/// Lowest priority available to ordinary processes
pub const MIN_PRIORITY: Priority = 5;

/// Reserved for the idle process alone
pub const SENTINEL_PRIORITY: Priority = 6;

/// Number of ready queues, one per priority level
pub const PRIORITY_LEVELS: usize = SENTINEL_PRIORITY as usize;

/// Priority `start1` is created with
pub const START1_PRIORITY: Priority = 1;

// =============================================================================
// STATUS CODES
// =============================================================================

/// Status codes at or below this value are reserved for the core.
/// `block_me` only accepts codes above it.
pub const MEBLOCKED: i32 = 10;

// =============================================================================
// HARDWARE DEFAULTS
// =============================================================================

/// Default minimum stack size for a process (80KB)
pub const DEFAULT_MIN_STACK: usize = 80 * 1024;

/// Default scheduling quantum (80ms)
pub const DEFAULT_QUANTUM_US: u64 = 80_000;

/// Default clock interrupt period (20ms)
pub const DEFAULT_CLOCK_PERIOD_US: u64 = 20_000;

/// Exit code the machine halts with on any fatal condition
pub const FATAL_EXIT_CODE: i32 = 1;
