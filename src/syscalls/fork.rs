/*!
 * Fork
 * Process creation: argument validation, slot allocation and linking
 */

use crate::core::errors::ForkError;
use crate::core::limits::{MAX_ARG_LEN, MAX_NAME_LEN, MAX_PRIORITY, SENTINEL_PRIORITY};
use crate::core::types::{ExitCode, Pid, Priority};
use crate::hardware::ExecContext;
use crate::monitoring::span_primitive;
use crate::process::{Chain, Pcb};
use crate::scheduler::runner::{boxed_entry, launch};
use crate::scheduler::Kernel;
use std::future::Future;
use tracing::info;

/// Checks that need no table access
pub(crate) fn validate_request(
    name: &str,
    arg: &str,
    priority: Priority,
    stack_size: usize,
    min_stack: usize,
    idle: bool,
) -> Result<(), ForkError> {
    if name.is_empty() {
        return Err(ForkError::NameMissing);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ForkError::NameTooLong {
            len: name.len(),
            limit: MAX_NAME_LEN,
        });
    }
    if arg.len() > MAX_ARG_LEN {
        return Err(ForkError::ArgTooLong {
            len: arg.len(),
            limit: MAX_ARG_LEN,
        });
    }
    if priority == SENTINEL_PRIORITY && !idle {
        return Err(ForkError::ReservedPriority(priority));
    }
    if !(MAX_PRIORITY..=SENTINEL_PRIORITY).contains(&priority) {
        return Err(ForkError::PriorityOutOfRange(priority));
    }
    if stack_size < min_stack {
        return Err(ForkError::StackTooSmall {
            requested: stack_size,
            minimum: min_stack,
        });
    }
    Ok(())
}

impl Kernel {
    /// Create a child of the running process and dispatch.
    ///
    /// `entry` runs with `arg` once the child is first selected; whatever
    /// it returns becomes the child's exit status. Returns the child's pid.
    pub async fn fork<F, Fut>(
        &self,
        name: &str,
        entry: F,
        arg: &str,
        stack_size: usize,
        priority: Priority,
    ) -> Result<Pid, ForkError>
    where
        F: FnOnce(Kernel, String) -> Fut + Send + 'static,
        Fut: Future<Output = ExitCode> + Send + 'static,
    {
        if let Err(halted) = self.require_kernel_mode("fork") {
            return halted.park().await;
        }
        let span = span_primitive("fork", self.getpid());

        let pid = match self.create_process(name, entry, arg, stack_size, priority, false) {
            Ok(pid) => pid,
            Err(e) => {
                span.record_error(&e);
                return Err(e);
            }
        };
        span.record_return(pid);

        self.dispatcher().await;
        Ok(pid)
    }

    /// Allocate, link and queue a new process without dispatching.
    /// `idle` marks the one request allowed to take the reserved priority.
    pub(crate) fn create_process<F, Fut>(
        &self,
        name: &str,
        entry: F,
        arg: &str,
        stack_size: usize,
        priority: Priority,
        idle: bool,
    ) -> Result<Pid, ForkError>
    where
        F: FnOnce(Kernel, String) -> Fut + Send + 'static,
        Fut: Future<Output = ExitCode> + Send + 'static,
    {
        validate_request(
            name,
            arg,
            priority,
            stack_size,
            self.inner.config.min_stack,
            idle,
        )?;
        let entry = boxed_entry(entry);
        let context = ExecContext::new(stack_size, launch(self.clone(), entry, arg.to_string()))
            .map_err(|_| ForkError::StackUnavailable {
                requested: stack_size,
            })?;

        let (pid, parent) = {
            let mut cs = self.critical_section();
            let state = &mut *cs;

            if idle
                && state
                    .table
                    .iter()
                    .any(|(_, pcb)| pcb.priority == SENTINEL_PRIORITY)
            {
                return Err(ForkError::ReservedPriority(priority));
            }

            let pid = state.table.allocate_pid().ok_or(ForkError::TableFull {
                capacity: state.table.capacity(),
            })?;

            let parent = state.current;
            let mut pcb = Pcb::new(pid, name, priority).with_context(context, arg.to_string());
            pcb.parent = parent;
            let slot = state.table.insert(pcb);

            if let Some(parent) = parent {
                state.table.push_back(parent, Chain::Children, slot);
                let parent = &mut state.table[parent];
                parent.num_kids += 1;
                parent.num_live_kids += 1;
            }
            state.ready.push_back(priority, pid);

            (pid, parent.map(|slot| state.table[slot].pid))
        };

        self.inner.hooks.on_fork(pid);
        info!(pid, name, priority, stack_size, parent = ?parent, "Process forked");
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::limits::DEFAULT_MIN_STACK;

    fn check(name: &str, arg: &str, priority: Priority, stack: usize) -> Result<(), ForkError> {
        validate_request(name, arg, priority, stack, DEFAULT_MIN_STACK, false)
    }

    #[test]
    fn test_accepts_valid_request() {
        assert_eq!(check("worker", "arg", 3, DEFAULT_MIN_STACK), Ok(()));
    }

    #[test]
    fn test_rejections_in_order() {
        assert_eq!(check("", "", 9, 0), Err(ForkError::NameMissing));

        let long_name = "n".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            check(&long_name, "", 3, DEFAULT_MIN_STACK),
            Err(ForkError::NameTooLong { .. })
        ));

        let long_arg = "a".repeat(MAX_ARG_LEN + 1);
        assert!(matches!(
            check("w", &long_arg, 3, DEFAULT_MIN_STACK),
            Err(ForkError::ArgTooLong { .. })
        ));

        assert_eq!(
            check("w", "", SENTINEL_PRIORITY, DEFAULT_MIN_STACK),
            Err(ForkError::ReservedPriority(SENTINEL_PRIORITY))
        );
        assert_eq!(
            check("w", "", 0, DEFAULT_MIN_STACK),
            Err(ForkError::PriorityOutOfRange(0))
        );
        assert_eq!(
            check("w", "", 7, DEFAULT_MIN_STACK),
            Err(ForkError::PriorityOutOfRange(7))
        );

        let err = check("w", "", 3, DEFAULT_MIN_STACK - 1).unwrap_err();
        assert_eq!(err.legacy_code(), -2);
    }

    #[test]
    fn test_idle_may_take_reserved_priority() {
        assert_eq!(
            validate_request("idle", "", SENTINEL_PRIORITY, 1024, 1024, true),
            Ok(())
        );
    }

    #[test]
    fn test_name_at_limit_is_accepted() {
        let name = "n".repeat(MAX_NAME_LEN);
        assert_eq!(check(&name, "", 1, DEFAULT_MIN_STACK), Ok(()));
    }
}
