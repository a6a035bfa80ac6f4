/*!
 * Run Loop
 *
 * Boot sequence, the launch trampoline and the loop that stands in for
 * the context-switch hardware. The loop polls the current process until
 * it yields, saves its context, and moves on to whichever process the
 * dispatcher made current. It returns when the machine halts.
 */

use super::Kernel;
use crate::core::errors::HaltReason;
use crate::core::limits::{FATAL_EXIT_CODE, SENTINEL_NAME, SENTINEL_PRIORITY, START1_PRIORITY};
use crate::core::types::{ExitCode, Pid};
use crate::hardware::{HaltReport, Psr, Task};
use crate::process::ProcessStatus;
use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use std::convert::Infallible;
use std::future::Future;
use std::task::{Context, Poll};
use tracing::{debug, error, info, trace};

const START1_NAME: &str = "start1";

/// Entry function of a process, boxed so every process body has one type
pub(crate) type EntryFn = Box<dyn FnOnce(Kernel, String) -> BoxFuture<'static, ExitCode> + Send>;

pub(crate) fn boxed_entry<F, Fut>(entry: F) -> EntryFn
where
    F: FnOnce(Kernel, String) -> Fut + Send + 'static,
    Fut: Future<Output = ExitCode> + Send + 'static,
{
    Box::new(move |kernel, arg| entry(kernel, arg).boxed())
}

/// Body every new context starts in: enable interrupts, run the entry
/// function, and quit with whatever it returns
pub(crate) fn launch(kernel: Kernel, entry: EntryFn, arg: String) -> Task {
    async move {
        if let Err(e) = kernel.enable_interrupts() {
            error!(pid = kernel.getpid(), error = %e, "Process could not enable interrupts");
            return kernel.fatal(HaltReason::InvalidPsr("launch")).park().await;
        }
        let status = entry(kernel.clone(), arg).await;
        kernel.terminate::<Infallible>(status).await
    }
    .boxed()
}

/// How a time slice ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slice {
    /// Yielded without a switch; polled again
    Continue,
    /// Another process became current
    Switched(Option<Pid>),
    /// The process quit
    Terminated,
    /// The machine stopped
    Halted,
}

impl Kernel {
    /// Boot with the built-in idle process and run `start1` until the
    /// machine halts
    pub fn startup<F, Fut>(&self, start1: F) -> HaltReport
    where
        F: FnOnce(Kernel, String) -> Fut + Send + 'static,
        Fut: Future<Output = ExitCode> + Send + 'static,
    {
        self.startup_with_idle(|kernel: Kernel, _arg: String| kernel.sentinel(), start1)
    }

    /// Boot with an application-supplied idle process
    pub fn startup_with_idle<I, IFut, F, Fut>(&self, idle: I, start1: F) -> HaltReport
    where
        I: FnOnce(Kernel, String) -> IFut + Send + 'static,
        IFut: Future<Output = ExitCode> + Send + 'static,
        F: FnOnce(Kernel, String) -> Fut + Send + 'static,
        Fut: Future<Output = ExitCode> + Send + 'static,
    {
        let already_started = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut state.started, true)
        };
        if already_started {
            // The running machine keeps its own halt; this caller gets a
            // report for the rejected start
            self.inner
                .machine
                .console(format!("FATAL: {}", HaltReason::AlreadyStarted));
            error!("Kernel started twice");
            return HaltReport {
                code: FATAL_EXIT_CODE,
                reason: HaltReason::AlreadyStarted,
                at: self.read_time(),
            };
        }

        let min_stack = self.inner.config.min_stack;
        info!(
            max_proc = self.inner.config.max_proc,
            quantum_us = self.inner.config.quantum_us,
            "Booting kernel"
        );

        if let Err(source) =
            self.create_process(SENTINEL_NAME, idle, "", min_stack, SENTINEL_PRIORITY, true)
        {
            let _ = self.fatal(HaltReason::BootFailed {
                name: SENTINEL_NAME,
                source,
            });
            return self.run();
        }

        if let Err(source) =
            self.create_process(START1_NAME, start1, "", 2 * min_stack, START1_PRIORITY, false)
        {
            let _ = self.fatal(HaltReason::BootFailed {
                name: START1_NAME,
                source,
            });
            return self.run();
        }

        let now = self.read_time();
        let selected = {
            let mut cs = self.critical_section();
            cs.select_next(now)
        };
        match selected {
            Ok(switch) => self.inner.hooks.on_switch(switch.old, switch.new),
            Err(reason) => {
                let _ = self.fatal(reason);
            }
        }

        self.run()
    }

    fn run(&self) -> HaltReport {
        let machine = &self.inner.machine;
        let mut cx = Context::from_waker(noop_waker_ref());

        loop {
            if let Some(report) = machine.halt_report() {
                self.release_contexts();
                return report;
            }

            let taken = {
                let mut state = self.inner.state.lock();
                take_current(&mut state)
            };
            let Some((slot, pid, mut task, psr)) = taken else {
                let _ = self.fatal(HaltReason::NoCurrentProcess);
                continue;
            };

            machine.set_psr(psr);
            match task.as_mut().poll(&mut cx) {
                Poll::Ready(never) => match never {},
                Poll::Pending => {}
            }
            let psr = machine.psr();

            let (slice, orphan) = {
                let mut state = self.inner.state.lock();
                let alive = matches!(
                    state.table.get(slot),
                    Some(pcb) if pcb.pid == pid && pcb.status != ProcessStatus::Quit
                );
                let slice = if machine.is_halted() {
                    Slice::Halted
                } else if !alive {
                    Slice::Terminated
                } else if state.current_pid() == Some(pid) {
                    Slice::Continue
                } else {
                    Slice::Switched(state.current_pid())
                };

                let orphan = match state.table.get_mut(slot).and_then(|pcb| pcb.context.as_mut()) {
                    Some(ctx) if alive => {
                        ctx.save(task, psr);
                        None
                    }
                    _ => Some(task),
                };
                (slice, orphan)
            };

            // A quit process's task is dropped with the lock released
            drop(orphan);
            trace!(pid, ?slice, at = self.read_time(), "Time slice ended");
        }
    }

    /// Drop every suspended task so the contexts release their handles
    /// on the kernel
    fn release_contexts(&self) {
        let tasks: Vec<Task> = {
            let mut state = self.inner.state.lock();
            state
                .table
                .iter_mut()
                .filter_map(|(_, pcb)| pcb.context.as_mut()?.take_task())
                .collect()
        };
        debug!(count = tasks.len(), "Released suspended contexts");
        drop(tasks);
    }
}

fn take_current(state: &mut super::KernelState) -> Option<(usize, Pid, Task, Psr)> {
    let slot = state.current?;
    let pcb = state.table.get_mut(slot)?;
    let pid = pcb.pid;
    let ctx = pcb.context.as_mut()?;
    let task = ctx.take_task()?;
    Some((slot, pid, task, ctx.psr()))
}
