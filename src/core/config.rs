/*!
 * Kernel Configuration
 *
 * Tunable parameters of the process core and the simulated machine
 */

use super::errors::ConfigError;
use super::limits::{
    DEFAULT_CLOCK_PERIOD_US, DEFAULT_MAX_PROC, DEFAULT_MIN_STACK, DEFAULT_QUANTUM_US,
};
use serde::{Deserialize, Serialize};

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KernelConfig {
    /// Number of process table slots
    pub max_proc: usize,
    /// Time a process may run before the clock handler dispatches
    pub quantum_us: u64,
    /// Interval between clock interrupts
    pub clock_period_us: u64,
    /// Smallest stack fork accepts
    pub min_stack: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_proc: DEFAULT_MAX_PROC,
            quantum_us: DEFAULT_QUANTUM_US,
            clock_period_us: DEFAULT_CLOCK_PERIOD_US,
            min_stack: DEFAULT_MIN_STACK,
        }
    }
}

impl KernelConfig {
    #[inline]
    #[must_use]
    pub fn with_max_proc(mut self, max_proc: usize) -> Self {
        self.max_proc = max_proc;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_quantum(mut self, quantum_us: u64) -> Self {
        self.quantum_us = quantum_us;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_clock_period(mut self, clock_period_us: u64) -> Self {
        self.clock_period_us = clock_period_us;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_min_stack(mut self, min_stack: usize) -> Self {
        self.min_stack = min_stack;
        self
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `KERNEL_MAX_PROC`, `KERNEL_QUANTUM_US`,
    /// `KERNEL_CLOCK_PERIOD_US` and `KERNEL_MIN_STACK`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = env_number("KERNEL_MAX_PROC")? {
            config.max_proc = v as usize;
        }
        if let Some(v) = env_number("KERNEL_QUANTUM_US")? {
            config.quantum_us = v;
        }
        if let Some(v) = env_number("KERNEL_CLOCK_PERIOD_US")? {
            config.clock_period_us = v;
        }
        if let Some(v) = env_number("KERNEL_MIN_STACK")? {
            config.min_stack = v as usize;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Two slots is the floor: the idle process plus start1
        if self.max_proc < 2 {
            return Err(ConfigError::InvalidValue {
                field: "max_proc",
                reason: format!("need at least 2 slots, got {}", self.max_proc),
            });
        }
        if self.quantum_us == 0 {
            return Err(ConfigError::InvalidValue {
                field: "quantum_us",
                reason: "must be positive".into(),
            });
        }
        if self.clock_period_us == 0 {
            return Err(ConfigError::InvalidValue {
                field: "clock_period_us",
                reason: "must be positive".into(),
            });
        }
        if self.min_stack == 0 {
            return Err(ConfigError::InvalidValue {
                field: "min_stack",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

fn env_number(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::BadEnv { var, value }),
        Err(_) => Ok(None),
    }
}
