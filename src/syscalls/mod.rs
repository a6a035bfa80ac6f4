/*!
 * Kernel Primitives
 *
 * fork, join, quit, zap, block_me and unblock_proc. Each one checks the
 * caller's privilege, mutates the process table inside a critical section
 * and then, outside it, hands the CPU to the dispatcher.
 */

pub(crate) mod block;
pub(crate) mod fork;
pub(crate) mod join;
pub(crate) mod zap;
