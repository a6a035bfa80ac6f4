/*!
 * Clock Device
 *
 * Microsecond counter that only moves when the running process executes
 * simulated work. Raises a tick every `period` microseconds; ticks that
 * arrive while interrupts are masked coalesce into one pending tick.
 */

use crate::core::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Clock {
    now: AtomicU64,
    next_tick: AtomicU64,
    period: u64,
}

impl Clock {
    pub fn new(period: u64) -> Self {
        Self {
            now: AtomicU64::new(0),
            next_tick: AtomicU64::new(period),
            period,
        }
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }

    #[inline]
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Run for at most `budget` microseconds, stopping early at the next
    /// tick boundary. Returns the time consumed.
    pub fn advance(&self, budget: u64) -> u64 {
        let now = self.now();
        let next = self.next_tick.load(Ordering::Acquire);
        let step = if now < next {
            budget.min(next - now)
        } else {
            budget
        };
        self.now.fetch_add(step, Ordering::AcqRel);
        step
    }

    #[inline]
    pub fn tick_pending(&self) -> bool {
        self.now() >= self.next_tick.load(Ordering::Acquire)
    }

    /// Clear the pending tick and arm the next one
    pub fn acknowledge(&self) {
        let now = self.now();
        let next = (now / self.period + 1) * self.period;
        self.next_tick.store(next, Ordering::Release);
    }

    /// Idle until the next tick is due
    pub fn wait_for_tick(&self) {
        let next = self.next_tick.load(Ordering::Acquire);
        self.now.fetch_max(next, Ordering::AcqRel);
    }
}
