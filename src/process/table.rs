/*!
 * Process Table
 *
 * Fixed-capacity arena of process control blocks. A pid always lives in
 * slot `(pid - 1) % capacity`, so two pids that share a slot can never be
 * live at once. Children, quit and zapper lists are intrusive chains of
 * slot indices threaded through the blocks themselves.
 */

use super::types::{Pcb, ProcessInfo, ProcessStatus};
use crate::core::types::Pid;
use log::debug;
use std::ops::{Index, IndexMut};

/// Intrusive lists a process can own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    /// Live children, in fork order
    Children,
    /// Children that quit and wait to be joined, in quit order
    Quit,
    /// Processes blocked in zap against the owner, in zap order
    Zappers,
}

pub struct ProcessTable {
    slots: Vec<Option<Pcb>>,
    last_pid: Pid,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            last_pid: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot a pid maps to
    #[inline]
    pub fn slot_of(&self, pid: Pid) -> usize {
        (pid.wrapping_sub(1) as usize) % self.slots.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Issue the smallest pid above every pid issued so far whose slot is
    /// free. `None` when the table is full.
    pub fn allocate_pid(&mut self) -> Option<Pid> {
        if self.is_full() {
            return None;
        }
        loop {
            self.last_pid += 1;
            if self.slots[self.slot_of(self.last_pid)].is_none() {
                return Some(self.last_pid);
            }
        }
    }

    /// Place a block in the slot its pid maps to. Returns the slot.
    ///
    /// # Panics
    /// If the slot is occupied; callers allocate the pid first.
    pub fn insert(&mut self, pcb: Pcb) -> usize {
        let slot = self.slot_of(pcb.pid);
        assert!(
            self.slots[slot].is_none(),
            "slot {} already holds pid {}",
            slot,
            self[slot].pid
        );
        debug!("Process {} ({}) placed in slot {}", pcb.pid, pcb.name, slot);
        self.slots[slot] = Some(pcb);
        slot
    }

    /// Return a slot to EMPTY, handing back the block
    pub fn remove(&mut self, slot: usize) -> Option<Pcb> {
        let pcb = self.slots.get_mut(slot)?.take();
        if let Some(ref pcb) = pcb {
            debug!("Process {} removed from slot {}", pcb.pid, slot);
        }
        pcb
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&Pcb> {
        self.slots.get(slot)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Pcb> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Slot currently bound to `pid`
    pub fn find(&self, pid: Pid) -> Option<usize> {
        if pid == 0 {
            return None;
        }
        let slot = self.slot_of(pid);
        match self.get(slot) {
            Some(pcb) if pcb.pid == pid => Some(slot),
            _ => None,
        }
    }

    /// Status of a slot, EMPTY when unused
    #[inline]
    pub fn status(&self, slot: usize) -> ProcessStatus {
        self.get(slot)
            .map(|pcb| pcb.status)
            .unwrap_or(ProcessStatus::Empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Pcb)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, pcb)| pcb.as_ref().map(|pcb| (slot, pcb)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Pcb)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, pcb)| pcb.as_mut().map(|pcb| (slot, pcb)))
    }

    /// Processes that exist and have not quit
    pub fn count_live(&self) -> usize {
        self.iter()
            .filter(|(_, pcb)| pcb.status != ProcessStatus::Quit)
            .count()
    }

    // =========================================================================
    // Intrusive chains
    // =========================================================================

    fn head(&self, owner: usize, chain: Chain) -> Option<usize> {
        let pcb = &self[owner];
        match chain {
            Chain::Children => pcb.first_child,
            Chain::Quit => pcb.quit_head,
            Chain::Zappers => pcb.zapper_head,
        }
    }

    fn set_head(&mut self, owner: usize, chain: Chain, slot: Option<usize>) {
        let pcb = &mut self[owner];
        match chain {
            Chain::Children => pcb.first_child = slot,
            Chain::Quit => pcb.quit_head = slot,
            Chain::Zappers => pcb.zapper_head = slot,
        }
    }

    fn next(&self, slot: usize, chain: Chain) -> Option<usize> {
        let pcb = &self[slot];
        match chain {
            Chain::Children => pcb.next_sibling,
            Chain::Quit => pcb.quit_next,
            Chain::Zappers => pcb.zapper_next,
        }
    }

    fn set_next(&mut self, slot: usize, chain: Chain, next: Option<usize>) {
        let pcb = &mut self[slot];
        match chain {
            Chain::Children => pcb.next_sibling = next,
            Chain::Quit => pcb.quit_next = next,
            Chain::Zappers => pcb.zapper_next = next,
        }
    }

    /// Append `slot` to the end of `owner`'s chain
    pub fn push_back(&mut self, owner: usize, chain: Chain, slot: usize) {
        self.set_next(slot, chain, None);
        match self.head(owner, chain) {
            Some(mut tail) => {
                while let Some(next) = self.next(tail, chain) {
                    tail = next;
                }
                self.set_next(tail, chain, Some(slot));
            }
            None => self.set_head(owner, chain, Some(slot)),
        }
    }

    /// Detach the first member of `owner`'s chain
    pub fn pop_front(&mut self, owner: usize, chain: Chain) -> Option<usize> {
        let head = self.head(owner, chain)?;
        let next = self.next(head, chain);
        self.set_head(owner, chain, next);
        self.set_next(head, chain, None);
        Some(head)
    }

    /// Detach `slot` from `owner`'s chain. False if it was not a member.
    pub fn unlink(&mut self, owner: usize, chain: Chain, slot: usize) -> bool {
        let mut prev: Option<usize> = None;
        let mut cursor = self.head(owner, chain);
        while let Some(current) = cursor {
            if current == slot {
                let next = self.next(current, chain);
                match prev {
                    Some(prev) => self.set_next(prev, chain, next),
                    None => self.set_head(owner, chain, next),
                }
                self.set_next(current, chain, None);
                return true;
            }
            prev = Some(current);
            cursor = self.next(current, chain);
        }
        false
    }

    /// Detach every member of `owner`'s chain, in order
    pub fn drain(&mut self, owner: usize, chain: Chain) -> Vec<usize> {
        let mut drained = Vec::new();
        while let Some(slot) = self.pop_front(owner, chain) {
            drained.push(slot);
        }
        drained
    }

    /// Members of `owner`'s chain, in order
    pub fn members(&self, owner: usize, chain: Chain) -> Vec<usize> {
        let mut members = Vec::new();
        let mut cursor = self.head(owner, chain);
        while let Some(slot) = cursor {
            members.push(slot);
            cursor = self.next(slot, chain);
        }
        members
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// One row per slot, empty slots included
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        (0..self.capacity()).map(|slot| self.info(slot)).collect()
    }

    pub fn info(&self, slot: usize) -> ProcessInfo {
        let Some(pcb) = self.get(slot) else {
            return ProcessInfo::empty(slot);
        };
        ProcessInfo {
            slot,
            pid: pcb.pid,
            name: pcb.name.to_string(),
            parent: pcb.parent.and_then(|p| self.get(p)).map(|p| p.pid),
            priority: pcb.priority,
            status: pcb.status,
            kids: pcb.num_kids,
            live_kids: pcb.num_live_kids,
            joins: pcb.num_joins,
            cpu_time: pcb.cpu_time,
            zapped: pcb.zapped,
            stack_size: pcb.stack_size,
            start_arg: pcb.start_arg.clone(),
            quit_status: pcb.quit_status,
        }
    }
}

impl Index<usize> for ProcessTable {
    type Output = Pcb;

    fn index(&self, slot: usize) -> &Pcb {
        match self.slots[slot] {
            Some(ref pcb) => pcb,
            None => panic!("slot {} is empty", slot),
        }
    }
}

impl IndexMut<usize> for ProcessTable {
    fn index_mut(&mut self, slot: usize) -> &mut Pcb {
        match self.slots[slot] {
            Some(ref mut pcb) => pcb,
            None => panic!("slot {} is empty", slot),
        }
    }
}
