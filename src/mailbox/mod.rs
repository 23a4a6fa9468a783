//! Inboxes and the registry behind them.
//!
//! An [`Inbox<M>`] is a FIFO queue of `M` owned by one process. The registry
//! keeps, per inbox, a queue of pending messages and a queue of parked
//! waiters, with the invariant that **at most one of the two is non-empty at
//! any quiescent point**: a send that finds a waiter hands the message off
//! directly (oldest waiter first), and a receive that finds a message
//! consumes it directly.
//!
//! Internally messages are type-erased (`Box<dyn Any>`); the typed public
//! surface of [`Inbox`] and [`Address`](crate::Address) guarantees the erased
//! value always downcasts back to the inbox's message type.
//!
//! # Lifetime
//!
//! An inbox slot is released when its last [`Inbox`] handle drops. Spawned
//! processes hold their inbox for the duration of the body, so process exit
//! releases the slot; addresses hold only the stamped identity
//! and become dead-letter sinks afterwards. Waiters parked on a released
//! inbox are never resumed.

mod address;

pub use address::Address;

use crate::runtime::{Cx, RuntimeShared};
use crate::tracing_compat::trace;
use crate::types::InboxId;
use crate::util::Table;
use crate::Io;
use core::fmt;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

type MessageCell = Rc<RefCell<Option<Box<dyn Any>>>>;

struct Waiter {
    cell: MessageCell,
    waker: Waker,
}

#[derive(Default)]
struct InboxSlot {
    messages: VecDeque<Box<dyn Any>>,
    waiters: VecDeque<Waiter>,
}

/// Outcome of delivering a message to an inbox.
pub(crate) enum Delivery {
    /// Handed directly to the oldest waiter; wake it after the registry
    /// borrow is released.
    Handoff(Waker),
    /// Appended to the message queue.
    Queued,
    /// The inbox is gone; the message is returned so the caller drops it
    /// outside the registry borrow.
    Dead(Box<dyn Any>),
}

/// Result of a non-blocking receive attempt.
pub(crate) enum MessagePoll {
    Message(Box<dyn Any>),
    Empty,
    Dead,
}

/// All live inbox slots, keyed by stamped identity.
pub(crate) struct Registry {
    slots: Table<InboxSlot>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Table::new(),
        }
    }

    pub(crate) fn create_slot(&mut self) -> InboxId {
        InboxId::from_handle(self.slots.claim(InboxSlot::default()))
    }

    /// Removes a slot, returning it so queued messages and waiters are
    /// dropped outside the registry borrow (they may own inboxes themselves).
    pub(crate) fn take_slot(&mut self, id: InboxId) -> Option<InboxSlot> {
        self.slots.release(id.handle())
    }

    pub(crate) fn deliver(&mut self, id: InboxId, message: Box<dyn Any>) -> Delivery {
        let Some(slot) = self.slots.lookup_mut(id.handle()) else {
            return Delivery::Dead(message);
        };
        if let Some(waiter) = slot.waiters.pop_front() {
            *waiter.cell.borrow_mut() = Some(message);
            Delivery::Handoff(waiter.waker)
        } else {
            slot.messages.push_back(message);
            Delivery::Queued
        }
    }

    pub(crate) fn try_take_message(&mut self, id: InboxId) -> MessagePoll {
        match self.slots.lookup_mut(id.handle()) {
            Some(slot) => slot
                .messages
                .pop_front()
                .map_or(MessagePoll::Empty, MessagePoll::Message),
            None => MessagePoll::Dead,
        }
    }

    pub(crate) fn park(&mut self, id: InboxId, cell: MessageCell, waker: Waker) {
        if let Some(slot) = self.slots.lookup_mut(id.handle()) {
            slot.waiters.push_back(Waiter { cell, waker });
        }
    }

    /// Replaces the waker of an already-parked waiter.
    ///
    /// A waiter no longer present was either handed a message (its cell is
    /// filled) or its inbox was released; either way there is nothing to do.
    pub(crate) fn refresh_waker(&mut self, id: InboxId, cell: &MessageCell, waker: &Waker) {
        if let Some(slot) = self.slots.lookup_mut(id.handle()) {
            if let Some(waiter) = slot
                .waiters
                .iter_mut()
                .find(|waiter| Rc::ptr_eq(&waiter.cell, cell))
            {
                waiter.waker = waker.clone();
            }
        }
    }

    /// Returns every inbox holding both queued messages and parked waiters.
    pub(crate) fn invariant_violations(&self) -> Vec<InboxId> {
        self.slots
            .entries()
            .filter(|(_, slot)| !slot.messages.is_empty() && !slot.waiters.is_empty())
            .map(|(handle, _)| InboxId::from_handle(handle))
            .collect()
    }
}

/// Releases the registry slot when the last `Inbox` handle drops.
struct InboxOwner {
    id: InboxId,
    shared: Weak<RuntimeShared>,
}

impl Drop for InboxOwner {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            let slot = shared.registry.borrow_mut().take_slot(self.id);
            if slot.is_some() {
                trace!(inbox = %self.id, "inbox released");
            }
            drop(slot);
        }
    }
}

/// A typed FIFO message queue owned by one process.
///
/// Cloning an `Inbox` shares the underlying queue; the slot is released when
/// the last clone drops. Addresses derived from an inbox outlive it safely
/// as dead-letter sinks.
pub struct Inbox<M> {
    id: InboxId,
    shared: Weak<RuntimeShared>,
    owner: Rc<InboxOwner>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Clone for Inbox<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Weak::clone(&self.shared),
            owner: Rc::clone(&self.owner),
            _marker: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Inbox<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inbox({})", self.id)
    }
}

impl<M: 'static> Inbox<M> {
    pub(crate) fn create_with(cx: &Cx) -> Self {
        let id = cx.shared.registry.borrow_mut().create_slot();
        trace!(inbox = %id, "inbox created");
        let shared = cx.downgrade();
        Self {
            id,
            shared: Weak::clone(&shared),
            owner: Rc::new(InboxOwner { id, shared }),
            _marker: PhantomData,
        }
    }

    /// Allocates a fresh inbox.
    #[must_use]
    pub fn create<E: 'static>() -> Io<Self, E> {
        Io::from_fn(|cx| async move { Ok(Self::create_with(&cx)) })
    }

    /// The identity of this inbox.
    #[must_use]
    pub fn id(&self) -> InboxId {
        self.id
    }

    /// Receives the next message.
    ///
    /// Consumes the head of the queue if one is pending; otherwise parks the
    /// current process until a send arrives. Waiters resume in FIFO order:
    /// with several receives parked, the oldest wins the next message.
    #[must_use]
    pub fn receive<E: 'static>(&self) -> Io<M, E> {
        let future = self.recv_future();
        Io::from_fn(move |_cx| async move { Ok(future.await) })
    }

    pub(crate) fn recv_future(&self) -> RecvFuture<M> {
        RecvFuture {
            shared: Weak::clone(&self.shared),
            inbox: self.id,
            cell: None,
            _owner: Rc::clone(&self.owner),
            _marker: PhantomData,
        }
    }

    /// An address accepting the inbox's own message type.
    #[must_use]
    pub fn address(&self) -> Address<M> {
        Address::mailbox(
            Weak::clone(&self.shared),
            self.id,
            Rc::new(|message: M| Box::new(message) as Box<dyn Any>),
        )
    }

    /// An address accepting `V`, transformed into `M` by `tag` on delivery.
    ///
    /// One inbox serves many addresses, each over a different visible type.
    #[must_use]
    pub fn address_with<V, F>(&self, tag: F) -> Address<V>
    where
        V: 'static,
        F: Fn(V) -> M + 'static,
    {
        Address::mailbox(
            Weak::clone(&self.shared),
            self.id,
            Rc::new(move |value: V| Box::new(tag(value)) as Box<dyn Any>),
        )
    }
}

/// Future behind [`Inbox::receive`].
///
/// Parks a handoff cell plus the task waker on the inbox's waiter queue. A
/// send fills the cell and wakes the task.
///
/// The future shares ownership of the inbox, so a pending receive keeps the
/// slot registered. When the owning process exits, its body future (and
/// with it any pending receive) is dropped, which is what finally releases
/// the slot; a parked waiter therefore never outlives its inbox.
pub(crate) struct RecvFuture<M> {
    shared: Weak<RuntimeShared>,
    inbox: InboxId,
    cell: Option<MessageCell>,
    _owner: Rc<InboxOwner>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: 'static> Future for RecvFuture<M> {
    type Output = M;

    fn poll(self: Pin<&mut Self>, task_cx: &mut Context<'_>) -> Poll<M> {
        let this = self.get_mut();

        if let Some(cell) = &this.cell {
            let handed_off = cell.borrow_mut().take();
            if let Some(message) = handed_off {
                return Poll::Ready(downcast_message(message));
            }
            // Spurious wake-up: keep the parked waker current.
            if let Some(shared) = this.shared.upgrade() {
                shared
                    .registry
                    .borrow_mut()
                    .refresh_waker(this.inbox, cell, task_cx.waker());
            }
            return Poll::Pending;
        }

        let Some(shared) = this.shared.upgrade() else {
            return Poll::Pending;
        };
        let polled = shared.registry.borrow_mut().try_take_message(this.inbox);
        match polled {
            MessagePoll::Message(message) => Poll::Ready(downcast_message(message)),
            MessagePoll::Empty => {
                let cell: MessageCell = Rc::new(RefCell::new(None));
                shared.registry.borrow_mut().park(
                    this.inbox,
                    Rc::clone(&cell),
                    task_cx.waker().clone(),
                );
                trace!(inbox = %this.inbox, "receive parked");
                this.cell = Some(cell);
                Poll::Pending
            }
            MessagePoll::Dead => Poll::Pending,
        }
    }
}

fn downcast_message<M: 'static>(message: Box<dyn Any>) -> M {
    match message.downcast::<M>() {
        Ok(message) => *message,
        Err(_) => unreachable!("inbox message type invariant violated"),
    }
}
