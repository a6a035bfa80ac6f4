/*!
 * Kernel Builder
 * Builder pattern for Kernel construction
 */

use super::{Inner, Kernel, KernelState};
use crate::core::config::KernelConfig;
use crate::core::errors::ConfigError;
use crate::hardware::Machine;
use crate::process::{KernelHooks, NoopHooks};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Builder for Kernel
pub struct KernelBuilder {
    config: KernelConfig,
    hooks: Option<Arc<dyn KernelHooks>>,
}

impl KernelBuilder {
    /// Create a new Kernel builder
    pub fn new() -> Self {
        Self {
            config: KernelConfig::default(),
            hooks: None,
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Install lifecycle hooks for a higher layer
    pub fn with_hooks(mut self, hooks: Arc<dyn KernelHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Build the Kernel, rejecting a configuration the machine cannot run
    pub fn build(self) -> Result<Kernel, ConfigError> {
        self.config.validate()?;
        Ok(self.assemble())
    }

    /// Assemble without validation; callers guarantee a sound config
    pub(crate) fn assemble(self) -> Kernel {
        let mut features = vec![format!("{} slots", self.config.max_proc)];
        features.push(format!("quantum {}us", self.config.quantum_us));
        features.push(format!("clock period {}us", self.config.clock_period_us));
        if self.hooks.is_some() {
            features.push("hooks".to_string());
        }

        info!("Kernel initialized with: {}", features.join(", "));

        Kernel {
            inner: Arc::new(Inner {
                machine: Machine::new(self.config.clock_period_us),
                state: Mutex::new(KernelState::new(self.config.max_proc)),
                hooks: self.hooks.unwrap_or_else(|| Arc::new(NoopHooks)),
                config: self.config,
            }),
        }
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
