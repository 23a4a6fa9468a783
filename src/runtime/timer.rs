//! Timer heap for sleep deadlines.
//!
//! A small min-heap of `(deadline, waker)` pairs. The scheduler consults the
//! earliest deadline when the ready queue drains, advances the clock, and
//! wakes every expired entry.

use super::clock::Time;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::task::Waker;

#[derive(Debug)]
struct PendingTimer {
    deadline: Time,
    order: u64,
    waker: Waker,
}

impl PartialEq for PendingTimer {
    fn eq(&self, other: &Self) -> bool {
        (self.deadline, self.order) == (other.deadline, other.order)
    }
}

impl Eq for PendingTimer {}

impl Ord for PendingTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap surfaces the maximum; invert so the earliest deadline
        // (and, within one deadline, the oldest registration) pops first.
        (other.deadline, other.order).cmp(&(self.deadline, self.order))
    }
}

impl PartialOrd for PendingTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending timers, earliest deadline first.
#[derive(Debug, Default)]
pub(crate) struct TimerHeap {
    heap: BinaryHeap<PendingTimer>,
    registered: u64,
}

impl TimerHeap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Registers a waker to fire at `deadline`.
    pub(crate) fn insert(&mut self, deadline: Time, waker: Waker) {
        let order = self.registered;
        self.registered += 1;
        self.heap.push(PendingTimer {
            deadline,
            order,
            waker,
        });
    }

    /// Returns the earliest pending deadline, if any.
    pub(crate) fn next_deadline(&self) -> Option<Time> {
        self.heap.peek().map(|e| e.deadline)
    }

    /// Pops the wakers of every timer with `deadline <= now`.
    pub(crate) fn pop_expired(&mut self, now: Time) -> Vec<Waker> {
        let mut expired = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            if let Some(entry) = self.heap.pop() {
                expired.push(entry.waker);
            }
        }
        expired
    }
}
