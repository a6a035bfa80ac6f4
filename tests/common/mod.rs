/*!
 * Shared helpers for the kernel integration tests
 */

#![allow(dead_code)]

use parking_lot::Mutex;
use sim_kernel::{Kernel, KernelConfig};
use std::sync::Arc;

/// Small stacks keep the tests light
pub const STACK: usize = 4 * 1024;

pub fn config() -> KernelConfig {
    KernelConfig::default().with_min_stack(STACK)
}

pub fn kernel() -> Kernel {
    kernel_with(config())
}

pub fn kernel_with(config: KernelConfig) -> Kernel {
    Kernel::builder()
        .with_config(config)
        .build()
        .expect("test config is valid")
}

/// Ordered log shared between process bodies and the test
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}
