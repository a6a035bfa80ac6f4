/*!
 * Critical Section Guard
 *
 * Scoped interrupt suppression around a locked value. Entering masks
 * interrupts and locks; dropping restores the interrupt flag that was in
 * effect on entry and unlocks, on every exit path.
 *
 * ## Example
 *
 * ```ignore
 * {
 *     let mut cs = CriticalSection::enter(&machine, &state);
 *     cs.table.remove(slot);
 * } // interrupts restored, lock released
 * kernel.dispatcher().await;
 * ```
 *
 * The guard must never be held across a context switch.
 */

use crate::hardware::Machine;
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};

pub struct CriticalSection<'a, T> {
    machine: &'a Machine,
    data: MutexGuard<'a, T>,
    restore: bool,
}

impl<'a, T> CriticalSection<'a, T> {
    pub fn enter(machine: &'a Machine, data: &'a Mutex<T>) -> Self {
        let restore = machine.mask_interrupts();
        Self {
            machine,
            data: data.lock(),
            restore,
        }
    }

    /// Whether interrupts were enabled when the section was entered
    #[inline]
    pub fn interrupts_were_enabled(&self) -> bool {
        self.restore
    }
}

impl<T> Deref for CriticalSection<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for CriticalSection<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T> Drop for CriticalSection<'_, T> {
    fn drop(&mut self) {
        self.machine.restore_interrupts(self.restore);
    }
}
