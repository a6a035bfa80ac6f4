/*!
 * Ready Queues
 * One FIFO per priority level, scanned from the most urgent level down
 */

use crate::core::limits::{MAX_PRIORITY, PRIORITY_LEVELS};
use crate::core::types::{Pid, Priority};
use log::trace;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct ReadyQueues {
    levels: Vec<VecDeque<Pid>>,
}

impl Default for ReadyQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyQueues {
    pub fn new() -> Self {
        Self {
            levels: (0..PRIORITY_LEVELS).map(|_| VecDeque::new()).collect(),
        }
    }

    #[inline]
    fn level(priority: Priority) -> usize {
        debug_assert!(priority >= MAX_PRIORITY && priority as usize <= PRIORITY_LEVELS);
        (priority - MAX_PRIORITY) as usize
    }

    /// Append `pid` to the tail of its level
    pub fn push_back(&mut self, priority: Priority, pid: Pid) {
        trace!("Ready queue {}: push {}", priority, pid);
        self.levels[Self::level(priority)].push_back(pid);
    }

    /// Drop `pid` from its level. False if it was not queued.
    pub fn remove(&mut self, priority: Priority, pid: Pid) -> bool {
        let queue = &mut self.levels[Self::level(priority)];
        match queue.iter().position(|&p| p == pid) {
            Some(pos) => {
                queue.remove(pos);
                trace!("Ready queue {}: removed {}", priority, pid);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, priority: Priority, pid: Pid) -> bool {
        self.levels[Self::level(priority)].contains(&pid)
    }

    /// Move `pid` to the tail of its level, keeping everyone else in order.
    /// Used when a quantum expires.
    pub fn rotate_to_back(&mut self, priority: Priority, pid: Pid) -> bool {
        if self.remove(priority, pid) {
            self.push_back(priority, pid);
            true
        } else {
            false
        }
    }

    /// Queue contents for one level, head first
    pub fn queue(&self, priority: Priority) -> Vec<Pid> {
        self.levels[Self::level(priority)].iter().copied().collect()
    }

    /// Every queued pid with its priority, most urgent level first
    pub fn iter(&self) -> impl Iterator<Item = (Priority, Pid)> + '_ {
        self.levels.iter().enumerate().flat_map(|(level, queue)| {
            let priority = level as Priority + MAX_PRIORITY;
            queue.iter().map(move |&pid| (priority, pid))
        })
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(VecDeque::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(VecDeque::is_empty)
    }
}
