//! Process spawning and request/reply helpers.
//!
//! A process is a running actor: a fresh inbox plus a body computation
//! scheduled against it. Spawning returns the child's address synchronously
//! while the body itself runs no earlier than the next scheduler turn, so a
//! message sent right after spawning is deliverable before the child's first
//! receive.
//!
//! Every process has exactly one **on-exit address**. The terminal result,
//! `Ok(value)` on success or `Err(error)` on an unrecovered failure, is
//! posted there exactly once, after the body finishes and before the inbox
//! is torn down. A process failure never crashes the runtime.

use crate::mailbox::{Address, Inbox};
use crate::promise::Promise;
use crate::runtime::{spawn_raw, Cx};
use crate::tracing_compat::debug;
use crate::Io;
use std::convert::Infallible;

/// Spawns an actor, returning its address.
///
/// The address is produced synchronously; the body is deferred to a later
/// scheduler turn. When the body terminates its result is posted to
/// `on_exit` and the inbox is released, turning extant addresses into
/// dead-letter sinks.
#[must_use]
pub fn spawn<M, A, E, E2, F>(actor: F, on_exit: Address<Result<A, E>>) -> Io<Address<M>, E2>
where
    M: 'static,
    A: 'static,
    E: 'static,
    E2: 'static,
    F: FnOnce(Inbox<M>) -> Io<A, E> + 'static,
{
    Io::from_fn(move |cx| async move { Ok(spawn_with(&cx, actor, on_exit)) })
}

pub(crate) fn spawn_with<M, A, E, F>(
    cx: &Cx,
    actor: F,
    on_exit: Address<Result<A, E>>,
) -> Address<M>
where
    M: 'static,
    A: 'static,
    E: 'static,
    F: FnOnce(Inbox<M>) -> Io<A, E> + 'static,
{
    let inbox = Inbox::<M>::create_with(cx);
    let address = inbox.address();
    let body = actor(inbox.clone());
    let run_cx = cx.clone();
    spawn_raw(cx, async move {
        let result = body.run(run_cx).await;
        debug!(inbox = %inbox.id(), failed = result.is_err(), "process exited");
        on_exit.deliver(result);
        // Tear the inbox down only after the exit result is visible.
        drop(inbox);
    });
    address
}

/// Spawns an actor together with a promise for its terminal result.
///
/// Combines inbox creation and [`spawn`]: the actor's on-exit address feeds
/// a fresh one-shot inbox, returned as a [`Promise`].
#[must_use]
pub fn spawn_monitored<M, A, E, E2, F>(actor: F) -> Io<(Address<M>, Promise<A, E>), E2>
where
    M: 'static,
    A: 'static,
    E: 'static,
    E2: 'static,
    F: FnOnce(Inbox<M>) -> Io<A, E> + 'static,
{
    Io::from_fn(move |cx| async move {
        let result_inbox = Inbox::<Result<A, E>>::create_with(&cx);
        let on_exit = result_inbox.address();
        let address = spawn_with(&cx, actor, on_exit);
        Ok((address, Promise::from_inbox(result_inbox)))
    })
}

/// Spawns a process that handles each incoming message with `handler`.
///
/// The worker is an infinite receive loop: it never terminates successfully,
/// so the success side of its on-exit result is [`Infallible`]. The first
/// failure from `handler` terminates the worker and is forwarded to
/// `on_exit`.
#[must_use]
pub fn spawn_worker<M, E, E2, F>(
    handler: F,
    on_exit: Address<Result<Infallible, E>>,
) -> Io<Address<M>, E2>
where
    M: 'static,
    E: 'static,
    E2: 'static,
    F: Fn(M) -> Io<(), E> + 'static,
{
    spawn(
        move |inbox| {
            Io::from_fn(move |cx| async move {
                loop {
                    let message = inbox.recv_future().await;
                    handler(message).run(cx.clone()).await?;
                }
            })
        },
        on_exit,
    )
}

/// Synchronous request/reply over a fresh one-shot reply inbox.
///
/// Builds the request with `make`, handing it the reply address, sends it to
/// `server`, and blocks until the reply arrives. If the server has already
/// exited the request dead-letters and the call parks forever; the caller
/// encodes timeouts at the actor level if it needs them.
#[must_use]
pub fn call<Req, Reply, E, F>(make: F, server: &Address<Req>) -> Io<Reply, E>
where
    Req: 'static,
    Reply: 'static,
    E: 'static,
    F: FnOnce(Address<Reply>) -> Req + 'static,
{
    let server = server.clone();
    Io::from_fn(move |cx| async move {
        let reply_inbox = Inbox::<Reply>::create_with(&cx);
        server.deliver(make(reply_inbox.address()));
        Ok(reply_inbox.recv_future().await)
    })
}

/// Runs `io` in a hidden process and forwards its result to `target`.
///
/// Returns immediately; the deferred body starts on a later scheduler turn.
#[must_use]
pub fn defer_to<A, E, E2>(io: Io<A, E>, target: Address<Result<A, E>>) -> Io<(), E2>
where
    A: 'static,
    E: 'static,
    E2: 'static,
{
    Io::from_fn(move |cx| async move {
        let run_cx = cx.clone();
        spawn_raw(&cx, async move {
            let result = io.run(run_cx).await;
            target.deliver(result);
        });
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Runtime, Time};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn spawn_returns_the_address_before_the_body_runs() {
        let mut runtime = Runtime::with_virtual_clock();
        let log = Rc::new(RefCell::new(Vec::new()));

        let body_log = Rc::clone(&log);
        let parent_log = Rc::clone(&log);
        let io: Io<(), String> = spawn(
            move |_inbox: Inbox<i32>| -> Io<(), String> {
                Io::effect(move || {
                    body_log.borrow_mut().push("child");
                    Ok(())
                })
            },
            crate::log_on_error(),
        )
        .and_then(move |_addr| {
            Io::effect(move || {
                parent_log.borrow_mut().push("parent");
                Ok(())
            })
        });

        assert_eq!(runtime.drive(io), Some(Ok(())));
        assert_eq!(*log.borrow(), vec!["parent", "child"]);
    }

    #[test]
    fn message_sent_after_spawn_reaches_the_first_receive() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<i32, String> = spawn_monitored(|inbox: Inbox<i32>| inbox.receive())
            .and_then(|(addr, promise)| addr.send(11).ignore_then(promise.join()));
        assert_eq!(runtime.drive(io), Some(Ok(11)));
    }

    #[test]
    fn on_exit_receives_the_terminal_result() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<Result<i32, String>, String> =
            Inbox::<Result<i32, String>>::create().and_then(|exits| {
                let on_exit = exits.address();
                spawn(|_inbox: Inbox<i32>| Io::succeed(5), on_exit).ignore_then(exits.receive())
            });
        assert_eq!(runtime.drive(io), Some(Ok(Ok(5))));
        assert!(runtime.check_mailbox_invariants().is_empty());
    }

    #[test]
    fn on_exit_never_fires_twice() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<Result<i32, String>, String> =
            Inbox::<Result<i32, String>>::create().and_then(|exits| {
                let on_exit = exits.address();
                spawn(|_inbox: Inbox<i32>| Io::succeed(5), on_exit)
                    .ignore_then(exits.receive())
                    .ignore_then(exits.receive())
            });
        // The second receive parks forever; the runtime still reaches idle.
        assert_eq!(runtime.drive(io), None);
    }

    #[test]
    fn failure_is_forwarded_to_on_exit() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<Result<i32, String>, String> =
            spawn_monitored(|_inbox: Inbox<i32>| Io::fail("broken".to_string()))
                .and_then(|(_addr, promise)| {
                    promise
                        .join()
                        .map(Ok)
                        .recover(|e| Io::succeed(Err(e)))
                });
        assert_eq!(runtime.drive(io), Some(Ok(Err("broken".to_string()))));
    }

    #[test]
    fn sends_after_exit_are_dead_lettered() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<(), String> = spawn_monitored(|_inbox: Inbox<i32>| Io::succeed(()))
            .and_then(|(addr, promise)| promise.join().ignore_then(addr.send(99)));
        assert_eq!(runtime.drive(io), Some(Ok(())));
    }

    #[test]
    fn worker_handles_messages_until_a_failure() {
        let mut runtime = Runtime::with_virtual_clock();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let io: Io<Result<Infallible, String>, String> =
            Inbox::<Result<Infallible, String>>::create().and_then(move |exits| {
                let on_exit = exits.address();
                spawn_worker(
                    move |n: i32| {
                        if n < 0 {
                            Io::fail(format!("negative: {n}"))
                        } else {
                            let sink = Rc::clone(&sink);
                            Io::effect(move || {
                                sink.borrow_mut().push(n);
                                Ok(())
                            })
                        }
                    },
                    on_exit,
                )
                .and_then(move |addr| {
                    addr.send(1)
                        .ignore_then(addr.send(2))
                        .ignore_then(addr.send(-1))
                        .ignore_then(addr.send(3))
                        .ignore_then(exits.receive())
                })
            });

        let exit = runtime
            .drive(io)
            .expect("completed")
            .expect("driver itself must not fail");
        match exit {
            Err(message) => assert_eq!(message, "negative: -1"),
            Ok(never) => match never {},
        }
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn call_round_trips_through_a_server() {
        let mut runtime = Runtime::with_virtual_clock();

        enum Request {
            Double(i32, Address<i32>),
        }

        let io: Io<i32, String> = spawn(
            |inbox: Inbox<Request>| -> Io<(), String> {
                inbox.receive().and_then(|Request::Double(n, reply)| {
                    reply.send(n * 2)
                })
            },
            crate::log_on_error(),
        )
        .and_then(|server| call(move |reply| Request::Double(21, reply), &server));

        assert_eq!(runtime.drive(io), Some(Ok(42)));
    }

    #[test]
    fn defer_to_forwards_the_result() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<Result<i32, String>, String> =
            Inbox::<Result<i32, String>>::create().and_then(|results| {
                let target = results.address();
                defer_to(
                    crate::sleep(Duration::from_millis(5)).ignore_then(Io::succeed(8)),
                    target,
                )
                .ignore_then(results.receive())
            });
        assert_eq!(runtime.drive(io), Some(Ok(Ok(8))));
        assert!(runtime.now() >= Time::from_millis(5));
    }
}
