//! Ready queue and task table for the cooperative scheduler.
//!
//! Processes are stored futures in a stamped-handle table. The ready queue is
//! the only piece of state a [`std::task::Waker`] touches, so it sits behind
//! an `Arc<Mutex<_>>` while everything else stays single-threaded.

use crate::types::ProcessId;
use crate::util::Table;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::Wake;

pub(crate) type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// FIFO queue of processes with a pending wake-up.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    queue: Mutex<VecDeque<ProcessId>>,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, process: ProcessId) {
        self.queue
            .lock()
            .expect("ready queue lock poisoned")
            .push_back(process);
    }

    pub(crate) fn pop(&self) -> Option<ProcessId> {
        self.queue
            .lock()
            .expect("ready queue lock poisoned")
            .pop_front()
    }
}

/// Waker that re-enqueues its process on the ready queue.
pub(crate) struct TaskWaker {
    pub(crate) process: ProcessId,
    pub(crate) ready: Arc<ReadyQueue>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.ready.push(self.process);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.ready.push(self.process);
    }
}

struct TaskRecord {
    /// Taken out while the process is being polled.
    future: Option<LocalBoxFuture<()>>,
}

/// Stored process futures, keyed by stamped handle.
#[derive(Default)]
pub(crate) struct TaskTable {
    tasks: Table<TaskRecord>,
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, future: LocalBoxFuture<()>) -> ProcessId {
        let handle = self.tasks.claim(TaskRecord {
            future: Some(future),
        });
        ProcessId::from_handle(handle)
    }

    /// Takes the process's future out for polling.
    ///
    /// Returns `None` for stale identifiers (the process already finished)
    /// and for duplicate wake-ups of a process currently being polled.
    pub(crate) fn begin_poll(&mut self, process: ProcessId) -> Option<LocalBoxFuture<()>> {
        self.tasks
            .lookup_mut(process.handle())
            .and_then(|record| record.future.take())
    }

    /// Puts a still-pending future back after a poll.
    pub(crate) fn finish_poll(&mut self, process: ProcessId, future: LocalBoxFuture<()>) {
        if let Some(record) = self.tasks.lookup_mut(process.handle()) {
            record.future = Some(future);
        }
    }

    /// Removes a finished process; its identifier goes stale.
    pub(crate) fn remove(&mut self, process: ProcessId) {
        self.tasks.release(process.handle());
    }

    /// Takes every stored future out of the table.
    ///
    /// Used on runtime drop: the futures own `Rc` handles back into the
    /// runtime, and dropping them outside the table borrow breaks the cycle.
    pub(crate) fn drain(&mut self) -> Vec<LocalBoxFuture<()>> {
        self.tasks
            .evict_all()
            .into_iter()
            .filter_map(|record| record.future)
            .collect()
    }
}
