/*!
 * Simulated Hardware
 *
 * The machine the process core runs on: a status register, a clock device,
 * an interrupt vector, a console and the halt line.
 */

mod clock;
mod context;
mod psr;

pub use clock::Clock;
pub use context::{ExecContext, Task};
pub use psr::{Mode, Psr, PsrError};

use crate::core::errors::HaltReason;
use crate::core::types::Timestamp;
use parking_lot::Mutex;
use std::future::Future;
use tracing::{error, info};

/// Interrupt lines routed through the vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Clock,
    Illegal,
}

/// Why and when the machine stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaltReport {
    pub code: i32,
    pub reason: HaltReason,
    pub at: Timestamp,
}

impl HaltReport {
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.code == 0
    }
}

/// Proof that the machine has halted. Code that holds one must not run
/// any further; `park` suspends it for good.
#[must_use = "a halted caller must park instead of continuing"]
#[derive(Debug)]
pub struct Halted(());

impl Halted {
    /// Never resolves: the run loop stops polling once the machine is halted
    pub fn park<T>(self) -> impl Future<Output = T> + Send {
        std::future::pending()
    }
}

pub struct Machine {
    psr: Mutex<Psr>,
    clock: Clock,
    halt: Mutex<Option<HaltReport>>,
    console: Mutex<Vec<String>>,
}

impl Machine {
    pub fn new(clock_period: u64) -> Self {
        Self {
            psr: Mutex::new(Psr::BOOT),
            clock: Clock::new(clock_period),
            halt: Mutex::new(None),
            console: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub fn psr(&self) -> Psr {
        *self.psr.lock()
    }

    #[inline]
    pub fn set_psr(&self, psr: Psr) {
        *self.psr.lock() = psr;
    }

    #[inline]
    pub fn is_kernel_mode(&self) -> bool {
        self.psr.lock().is_kernel()
    }

    #[inline]
    pub fn interrupts_enabled(&self) -> bool {
        self.psr.lock().interrupts
    }

    /// Change the interrupt flag, returning the previous value
    pub fn set_interrupts(&self, enabled: bool) -> Result<bool, PsrError> {
        let mut psr = self.psr.lock();
        let previous = psr.interrupts;
        *psr = psr.with_interrupts(enabled)?;
        Ok(previous)
    }

    /// Mask interrupts regardless of mode; used on critical-section entry
    /// after the caller's privilege has been checked
    pub(crate) fn mask_interrupts(&self) -> bool {
        let mut psr = self.psr.lock();
        let previous = psr.interrupts;
        psr.interrupts = false;
        previous
    }

    pub(crate) fn restore_interrupts(&self, enabled: bool) {
        self.psr.lock().interrupts = enabled;
    }

    #[inline]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Stop the machine. The first halt wins; later calls only return
    /// the proof.
    pub fn halt(&self, code: i32, reason: HaltReason) -> Halted {
        let mut halt = self.halt.lock();
        if halt.is_none() {
            let at = self.clock.now();
            if code == 0 {
                info!(code, at, %reason, "Machine halted");
            } else {
                error!(code, at, %reason, "Machine halted");
            }
            *halt = Some(HaltReport { code, reason, at });
        }
        Halted(())
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halt.lock().is_some()
    }

    pub fn halt_report(&self) -> Option<HaltReport> {
        self.halt.lock().clone()
    }

    /// Write a line to the console
    pub fn console(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "console", "{}", line);
        self.console.lock().push(line);
    }

    /// Everything written to the console so far
    pub fn transcript(&self) -> Vec<String> {
        self.console.lock().clone()
    }
}
