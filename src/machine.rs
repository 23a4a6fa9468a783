//! State-machine actors: init once, then receive → update → effect.
//!
//! A [`Machine`] factors an actor's behavior into an initial setup and a
//! message-indexed transition function. The runtime wraps it in a process
//! whose loop is flat: each iteration parks on receive and hands control
//! back to the scheduler, so long-running machines accumulate no stack.
//!
//! # Example
//!
//! ```ignore
//! struct Counter;
//!
//! enum Msg {
//!     Increment,
//!     SendValueTo(Address<i64>),
//! }
//!
//! impl Machine for Counter {
//!     type Args = i64;
//!     type Model = i64;
//!     type Msg = Msg;
//!     type Error = String;
//!
//!     fn init(start: i64) -> (i64, Io<(), String>) {
//!         (start, Io::none())
//!     }
//!
//!     fn update(msg: Msg, count: i64) -> (i64, Io<(), String>) {
//!         match msg {
//!             Msg::Increment => (count + 1, Io::none()),
//!             Msg::SendValueTo(reply) => (count, reply.send(count)),
//!         }
//!     }
//! }
//! ```

use crate::mailbox::{Address, Inbox};
use crate::runtime::spawn_raw;
use crate::tracing_compat::debug;
use crate::Io;
use std::convert::Infallible;

/// Behavior of a state-machine actor.
pub trait Machine {
    /// Input to [`init`](Self::init).
    type Args;

    /// Private state carried between messages.
    type Model: 'static;

    /// Messages the machine receives.
    type Msg: 'static;

    /// Failure type of the emitted effects.
    type Error: 'static;

    /// Produces the initial model and a setup effect, run once before the
    /// first receive.
    fn init(args: Self::Args) -> (Self::Model, Io<(), Self::Error>);

    /// Consumes one message, producing the next model and an effect to run
    /// before the next receive.
    fn update(msg: Self::Msg, model: Self::Model) -> (Self::Model, Io<(), Self::Error>);
}

/// Spawns a [`Machine`] as a process, returning its address.
///
/// `init` runs on the machine's first turn. If its effect fails, the error
/// is posted to `on_exit` and the machine never starts receiving; its inbox
/// stays registered, so sends to the returned address accumulate unread.
/// Otherwise the loop is receive → update → run the emitted effect → repeat;
/// the loop never terminates successfully, and the first failing effect
/// terminates the machine with its error forwarded to `on_exit`.
#[must_use]
pub fn spawn_machine<SM, E2>(
    args: SM::Args,
    on_exit: Address<Result<Infallible, SM::Error>>,
) -> Io<Address<SM::Msg>, E2>
where
    SM: Machine + 'static,
    SM::Args: 'static,
    E2: 'static,
{
    Io::from_fn(move |cx| async move {
        let inbox = Inbox::<SM::Msg>::create_with(&cx);
        let address = inbox.address();
        let run_cx = cx.clone();
        spawn_raw(&cx, async move {
            let (mut model, setup) = SM::init(args);
            if let Err(error) = setup.run(run_cx.clone()).await {
                debug!(inbox = %inbox.id(), "machine init failed");
                on_exit.deliver(Err(error));
                // Never start receiving; the inbox stays alive and sends
                // accumulate.
                std::future::pending::<()>().await;
            }
            loop {
                let message = inbox.recv_future().await;
                let (next, effect) = SM::update(message, model);
                model = next;
                if let Err(error) = effect.run(run_cx.clone()).await {
                    debug!(inbox = %inbox.id(), "machine update failed");
                    on_exit.deliver(Err(error));
                    break;
                }
            }
        });
        Ok(address)
    })
}
