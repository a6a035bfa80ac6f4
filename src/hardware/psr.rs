/*!
 * Processor Status Register
 * Privilege mode and interrupt-enable flag of the simulated CPU
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Privilege mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Kernel,
    User,
}

/// Status register update failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsrError {
    #[error("Interrupt flag can only be changed in kernel mode")]
    NotPrivileged,
}

/// Status register contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr {
    pub mode: Mode,
    pub interrupts: bool,
}

impl Psr {
    /// State the machine boots in and every new context starts with
    pub const BOOT: Psr = Psr {
        mode: Mode::Kernel,
        interrupts: false,
    };

    /// State while an interrupt handler runs
    pub const HANDLER: Psr = Psr {
        mode: Mode::Kernel,
        interrupts: false,
    };

    #[inline(always)]
    #[must_use]
    pub const fn is_kernel(&self) -> bool {
        matches!(self.mode, Mode::Kernel)
    }

    /// Same register with the interrupt flag changed
    pub fn with_interrupts(self, enabled: bool) -> Result<Psr, PsrError> {
        if !self.is_kernel() {
            return Err(PsrError::NotPrivileged);
        }
        Ok(Psr {
            interrupts: enabled,
            ..self
        })
    }

    #[inline]
    #[must_use]
    pub const fn with_mode(self, mode: Mode) -> Psr {
        Psr { mode, ..self }
    }
}

impl Default for Psr {
    fn default() -> Self {
        Psr::BOOT
    }
}
