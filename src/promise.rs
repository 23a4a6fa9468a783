//! One-shot results from forked computations.
//!
//! [`fork`] schedules a computation as its own hidden process and returns a
//! [`Promise`] immediately; the caller resumes without waiting.
//! [`Promise::join`] blocks on the forked result.
//!
//! A promise is one-shot: `join` consumes it, so a second join does not
//! typecheck. (The underlying inbox has exactly one producer which sends
//! exactly once.)

use crate::mailbox::Inbox;
use crate::runtime::{spawn_raw, Cx};
use crate::Io;
use core::fmt;

/// The pending result of a forked computation.
pub struct Promise<A, E> {
    inbox: Inbox<Result<A, E>>,
}

impl<A: 'static, E: 'static> fmt::Debug for Promise<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise({})", self.inbox.id())
    }
}

impl<A: 'static, E: 'static> Promise<A, E> {
    pub(crate) fn from_inbox(inbox: Inbox<Result<A, E>>) -> Self {
        Self { inbox }
    }

    /// Blocks until the forked computation finishes, yielding its result on
    /// the matching channel.
    #[must_use]
    pub fn join(self) -> Io<A, E> {
        Io::from_fn(move |_cx| self.into_result())
    }

    /// The raw future behind [`join`](Self::join), for crate-internal
    /// composition.
    pub(crate) async fn into_result(self) -> Result<A, E> {
        self.inbox.recv_future().await
    }
}

/// Schedules `io` as a hidden process and returns its promise immediately.
///
/// The forked body runs no earlier than the next scheduler turn. Dropping
/// the promise abandons the result: the producer's send dead-letters and the
/// forked computation still runs to completion.
#[must_use]
pub fn fork<A, E, E2>(io: Io<A, E>) -> Io<Promise<A, E>, E2>
where
    A: 'static,
    E: 'static,
    E2: 'static,
{
    Io::from_fn(move |cx| async move { Ok(fork_with(&cx, io)) })
}

pub(crate) fn fork_with<A, E>(cx: &Cx, io: Io<A, E>) -> Promise<A, E>
where
    A: 'static,
    E: 'static,
{
    let inbox = Inbox::<Result<A, E>>::create_with(cx);
    let resolve = inbox.address();
    let run_cx = cx.clone();
    spawn_raw(cx, async move {
        let result = io.run(run_cx).await;
        resolve.deliver(result);
    });
    Promise { inbox }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sleep, Runtime, Time};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn fork_join_round_trips_the_result() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<i32, String> = fork(Io::succeed(42)).and_then(Promise::join);
        assert_eq!(runtime.drive(io), Some(Ok(42)));
    }

    #[test]
    fn fork_join_round_trips_the_failure() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<i32, String> =
            fork(Io::fail("nope".to_string())).and_then(Promise::join);
        assert_eq!(runtime.drive(io), Some(Err("nope".to_string())));
    }

    #[test]
    fn fork_defers_the_body_to_a_later_turn() {
        let mut runtime = Runtime::with_virtual_clock();
        let log = Rc::new(RefCell::new(Vec::new()));

        let forked = {
            let log = Rc::clone(&log);
            Io::effect(move || {
                log.borrow_mut().push("forked");
                Ok(1)
            })
        };
        let after_fork = {
            let log = Rc::clone(&log);
            Io::effect(move || {
                log.borrow_mut().push("caller");
                Ok(())
            })
        };

        let io: Io<i32, String> = fork(forked)
            .then_ignore(after_fork)
            .and_then(Promise::join);
        assert_eq!(runtime.drive(io), Some(Ok(1)));
        assert_eq!(*log.borrow(), vec!["caller", "forked"]);
    }

    #[test]
    fn abandoned_promise_still_runs_the_body() {
        let mut runtime = Runtime::with_virtual_clock();
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);

        let body: Io<(), String> = sleep(Duration::from_millis(10)).ignore_then(Io::effect(
            move || {
                *flag.borrow_mut() = true;
                Ok(())
            },
        ));
        let io: Io<(), String> = fork(body).map(drop);
        assert_eq!(runtime.drive(io), Some(Ok(())));
        assert!(*ran.borrow());
        assert!(runtime.now() >= Time::from_millis(10));
    }
}
