//! Send-only capabilities targeting an inbox.
//!
//! An [`Address<V>`] accepts values of `V` and delivers them into some inbox,
//! transforming each value into the inbox's message type on the way in. The
//! send path is type-erased internally; the typed surface keeps it safe.
//!
//! Addresses never fail. If the target inbox has been released the value is
//! discarded: the sender cannot distinguish a slow consumer from a dead one,
//! and an actor must not fail because of the independent lifecycle of
//! another actor.
//!
//! A few addresses are *synthetic*: they carry a direct handler instead of an
//! inbox identity ([`exit_on_error`](crate::exit_on_error) and
//! [`log_on_error`](crate::log_on_error)).

use crate::runtime::RuntimeShared;
use crate::tracing_compat::trace;
use crate::types::InboxId;
use crate::Io;
use core::fmt;
use std::any::Any;
use std::rc::{Rc, Weak};

enum AddressInner<V> {
    Mailbox {
        shared: Weak<RuntimeShared>,
        inbox: InboxId,
        tag: Rc<dyn Fn(V) -> Box<dyn Any>>,
    },
    Handler {
        handler: Rc<dyn Fn(V)>,
    },
}

/// A send-only capability for values of type `V`.
///
/// Cheap to clone and safe to hand to any number of processes.
pub struct Address<V> {
    inner: AddressInner<V>,
}

impl<V> Clone for Address<V> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            AddressInner::Mailbox { shared, inbox, tag } => AddressInner::Mailbox {
                shared: Weak::clone(shared),
                inbox: *inbox,
                tag: Rc::clone(tag),
            },
            AddressInner::Handler { handler } => AddressInner::Handler {
                handler: Rc::clone(handler),
            },
        };
        Self { inner }
    }
}

impl<V> fmt::Debug for Address<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            AddressInner::Mailbox { inbox, .. } => write!(f, "Address({inbox})"),
            AddressInner::Handler { .. } => write!(f, "Address(handler)"),
        }
    }
}

impl<V: 'static> Address<V> {
    pub(crate) fn mailbox(
        shared: Weak<RuntimeShared>,
        inbox: InboxId,
        tag: Rc<dyn Fn(V) -> Box<dyn Any>>,
    ) -> Self {
        Self {
            inner: AddressInner::Mailbox { shared, inbox, tag },
        }
    }

    pub(crate) fn from_handler<H>(handler: H) -> Self
    where
        H: Fn(V) + 'static,
    {
        Self {
            inner: AddressInner::Handler {
                handler: Rc::new(handler),
            },
        }
    }

    /// Sends `value` to the target inbox.
    ///
    /// Always succeeds. The message either lands in the queue, hands off to
    /// the oldest parked waiter, or (if the inbox has been released) is
    /// silently discarded. The delivery is complete before any subsequent
    /// operation of the sender begins.
    #[must_use]
    pub fn send<E: 'static>(&self, value: V) -> Io<(), E> {
        let address = self.clone();
        Io::from_fn(move |_cx| async move {
            address.deliver(value);
            Ok(())
        })
    }

    /// Synchronous delivery path shared by [`send`](Self::send) and the
    /// runtime's own result forwarding.
    pub(crate) fn deliver(&self, value: V) {
        match &self.inner {
            AddressInner::Handler { handler } => handler(value),
            AddressInner::Mailbox { shared, inbox, tag } => {
                let Some(shared) = shared.upgrade() else {
                    trace!(inbox = %inbox, "dead-letter: runtime gone");
                    return;
                };
                let message = tag(value);
                let outcome = shared.registry.borrow_mut().deliver(*inbox, message);
                match outcome {
                    super::Delivery::Handoff(waker) => {
                        trace!(inbox = %inbox, "message handed to waiter");
                        waker.wake();
                    }
                    super::Delivery::Queued => {
                        trace!(inbox = %inbox, "message queued");
                    }
                    super::Delivery::Dead(message) => {
                        trace!(inbox = %inbox, "dead-letter: inbox released");
                        drop(message);
                    }
                }
            }
        }
    }

    /// Derives an address accepting `U` by transforming each value into `V`
    /// before delivery.
    ///
    /// Composes with the address's existing transform.
    #[must_use]
    pub fn contramap<U, F>(&self, f: F) -> Address<U>
    where
        U: 'static,
        F: Fn(U) -> V + 'static,
    {
        match &self.inner {
            AddressInner::Mailbox { shared, inbox, tag } => {
                let tag = Rc::clone(tag);
                Address::mailbox(
                    Weak::clone(shared),
                    *inbox,
                    Rc::new(move |value: U| tag(f(value))),
                )
            }
            AddressInner::Handler { handler } => {
                let handler = Rc::clone(handler);
                Address::from_handler(move |value: U| handler(f(value)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Inbox, Runtime};
    use std::cell::RefCell;

    #[test]
    fn handler_addresses_invoke_directly() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let addr: Address<i32> = Address::from_handler(move |n| sink.borrow_mut().push(n));
        addr.deliver(1);
        addr.clone().deliver(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn contramap_composes_transforms() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<String, String> = Inbox::<String>::create().and_then(|inbox| {
            let upper = inbox.address_with(|s: String| s.to_uppercase());
            let exclaim = upper.contramap(|s: String| format!("{s}!"));
            exclaim
                .send("hey".to_string())
                .ignore_then(inbox.receive())
        });
        assert_eq!(runtime.drive(io), Some(Ok("HEY!".to_string())));
    }

    #[test]
    fn contramap_on_handler_addresses() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let addr: Address<String> = Address::from_handler(move |s| sink.borrow_mut().push(s));
        let numbered = addr.contramap(|n: i32| format!("#{n}"));
        numbered.deliver(7);
        assert_eq!(*seen.borrow(), vec!["#7".to_string()]);
    }
}
