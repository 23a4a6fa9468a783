//! Single-threaded cooperative scheduler.
//!
//! The runtime owns four pieces of state:
//!
//! - a **task table**: stored futures, one per process
//! - a **ready queue**: processes with a pending wake-up (FIFO)
//! - a **timer heap**: sleep deadlines with their wakers
//! - the **inbox registry**: per-inbox message and waiter queues
//!
//! Execution drains the ready queue one process at a time; a process only
//! yields at a suspension point (receive on an empty inbox, sleep, or the
//! deferred first turn of a freshly spawned process). When the ready queue is
//! empty the clock advances to the earliest timer deadline and the expired
//! wakers fire. When no process is ready and no timer is pending the runtime
//! is idle: every remaining process is parked on an inbox that will never
//! receive another message.
//!
//! Two clock modes mirror production and test use: [`Runtime::new`] tracks
//! wall time and blocks the thread between deadlines, while
//! [`Runtime::with_virtual_clock`] jumps time forward deterministically.

mod clock;
mod scheduler;
mod timer;

pub use clock::Time;
pub(crate) use scheduler::LocalBoxFuture;

use crate::mailbox::Registry;
use crate::tracing_compat::{debug, trace};
use crate::types::{InboxId, ProcessId};
use clock::Clock;
use scheduler::{ReadyQueue, TaskTable, TaskWaker};
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use timer::TimerHeap;

/// Shared state behind every capability handle.
pub(crate) struct RuntimeShared {
    pub(crate) registry: RefCell<Registry>,
    pub(crate) tasks: RefCell<TaskTable>,
    pub(crate) ready: Arc<ReadyQueue>,
    pub(crate) timers: RefCell<TimerHeap>,
    pub(crate) clock: RefCell<Clock>,
}

/// Capability handle threaded through every running [`Io`](crate::Io).
///
/// Effects reach the scheduler exclusively through this handle; there is no
/// ambient global runtime.
#[derive(Clone)]
pub(crate) struct Cx {
    pub(crate) shared: Rc<RuntimeShared>,
}

impl Cx {
    /// Returns the current time on the runtime's clock.
    pub(crate) fn now(&self) -> Time {
        self.shared.clock.borrow().now()
    }

    /// Returns a future that completes once `duration` has elapsed.
    pub(crate) fn sleep(&self, duration: Duration) -> Sleep {
        Sleep {
            shared: Rc::downgrade(&self.shared),
            deadline: self.now() + duration,
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeShared> {
        Rc::downgrade(&self.shared)
    }
}

/// Stores a process future and schedules its first turn.
///
/// The future runs no earlier than the next scheduler turn; the caller keeps
/// running uninterrupted until its own next suspension point.
pub(crate) fn spawn_raw<F>(cx: &Cx, future: F) -> ProcessId
where
    F: Future<Output = ()> + 'static,
{
    let pid = cx.shared.tasks.borrow_mut().insert(Box::pin(future));
    cx.shared.ready.push(pid);
    debug!(process = %pid, "process spawned");
    pid
}

/// A future that completes once the runtime clock reaches its deadline.
pub(crate) struct Sleep {
    shared: Weak<RuntimeShared>,
    deadline: Time,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, task_cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let Some(shared) = this.shared.upgrade() else {
            // Runtime gone; nothing will ever advance the clock.
            return Poll::Pending;
        };
        let now = shared.clock.borrow().now();
        if now >= this.deadline {
            return Poll::Ready(());
        }
        shared
            .timers
            .borrow_mut()
            .insert(this.deadline, task_cx.waker().clone());
        trace!(deadline = %this.deadline, "sleep parked");
        Poll::Pending
    }
}

/// The actor runtime: scheduler, timers, clock, and inbox registry.
///
/// [`program`](crate::program) wraps a wall-clock runtime; tests usually hold
/// one directly with [`Runtime::with_virtual_clock`] and feed it work through
/// [`Runtime::drive`].
pub struct Runtime {
    shared: Rc<RuntimeShared>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a runtime on the wall clock.
    ///
    /// `sleep` blocks the thread for real time between deadlines.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::wall())
    }

    /// Creates a runtime on a virtual clock starting at [`Time::ZERO`].
    ///
    /// Time only advances when the ready queue drains and the scheduler jumps
    /// to the next timer deadline, which makes sleep-heavy scenarios
    /// deterministic and instant.
    #[must_use]
    pub fn with_virtual_clock() -> Self {
        Self::with_clock(Clock::virtual_clock())
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            shared: Rc::new(RuntimeShared {
                registry: RefCell::new(Registry::new()),
                tasks: RefCell::new(TaskTable::new()),
                ready: Arc::new(ReadyQueue::new()),
                timers: RefCell::new(TimerHeap::new()),
                clock: RefCell::new(clock),
            }),
        }
    }

    pub(crate) fn cx(&self) -> Cx {
        Cx {
            shared: Rc::clone(&self.shared),
        }
    }

    /// Returns the current time on the runtime's clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.shared.clock.borrow().now()
    }

    /// Spawns an actor from outside any running process.
    ///
    /// Same contract as [`spawn`](crate::spawn): the address is returned
    /// immediately, the body runs once the scheduler does, and the terminal
    /// result is posted to `on_exit` exactly once.
    pub fn spawn<M, A, E, F>(
        &self,
        actor: F,
        on_exit: crate::Address<Result<A, E>>,
    ) -> crate::Address<M>
    where
        M: 'static,
        A: 'static,
        E: 'static,
        F: FnOnce(crate::Inbox<M>) -> crate::Io<A, E> + 'static,
    {
        crate::process::spawn_with(&self.cx(), actor, on_exit)
    }

    /// Runs a single [`Io`](crate::Io) to completion.
    ///
    /// Schedules the value as a process, runs the scheduler to idle, and
    /// returns the result. Returns `None` if the value parked forever (for
    /// example a receive on an inbox nobody sends to); the runtime still
    /// reaches idle in that case.
    pub fn drive<A, E>(&mut self, io: crate::Io<A, E>) -> Option<Result<A, E>>
    where
        A: 'static,
        E: 'static,
    {
        let cell = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&cell);
        let cx = self.cx();
        let run_cx = cx.clone();
        spawn_raw(&cx, async move {
            let result = io.run(run_cx).await;
            *slot.borrow_mut() = Some(result);
        });
        self.run_until_idle();
        let result = cell.borrow_mut().take();
        result
    }

    /// Runs the scheduler until no process is ready and no timer is pending.
    ///
    /// Processes parked on inboxes with no possible sender are left parked;
    /// they are not an obstacle to idleness.
    pub fn run_until_idle(&mut self) {
        loop {
            while let Some(pid) = self.shared.ready.pop() {
                self.poll_process(pid);
            }

            let deadline = self.shared.timers.borrow().next_deadline();
            let Some(deadline) = deadline else {
                break;
            };
            self.shared.clock.borrow_mut().advance_to(deadline);
            let now = self.shared.clock.borrow().now();
            let expired = self.shared.timers.borrow_mut().pop_expired(now);
            trace!(now = %now, fired = expired.len(), "timers fired");
            for waker in expired {
                waker.wake();
            }
        }
        debug!("scheduler idle");
    }

    fn poll_process(&mut self, pid: ProcessId) {
        // The future is taken out of the table for the duration of the poll
        // so the process can spawn, send, and park without re-entrant borrows.
        let Some(mut future) = self.shared.tasks.borrow_mut().begin_poll(pid) else {
            return;
        };
        let waker = Waker::from(Arc::new(TaskWaker {
            process: pid,
            ready: Arc::clone(&self.shared.ready),
        }));
        let mut task_cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut task_cx) {
            Poll::Ready(()) => {
                trace!(process = %pid, "process finished");
                self.shared.tasks.borrow_mut().remove(pid);
                // Dropping the future outside the table borrow: destructors
                // may tear down inboxes through the registry.
                drop(future);
            }
            Poll::Pending => {
                self.shared.tasks.borrow_mut().finish_poll(pid, future);
            }
        }
    }

    /// Returns the inboxes currently violating the mailbox invariant.
    ///
    /// At any quiescent point an inbox holds queued messages or parked
    /// waiters, never both: a send with a waiter present hands the message
    /// off directly, and a receive with a message present consumes it
    /// directly. An empty result means the invariant holds everywhere.
    #[must_use]
    pub fn check_mailbox_invariants(&self) -> Vec<InboxId> {
        self.shared.registry.borrow().invariant_violations()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Stored futures hold strong handles back into the shared state;
        // dropping them outside the table borrow breaks the cycles.
        let futures = self.shared.tasks.borrow_mut().drain();
        drop(futures);
    }
}
