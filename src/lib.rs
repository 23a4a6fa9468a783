//! Actio: an actor-model concurrency runtime on a deferred, two-channel
//! I/O value.
//!
//! # Overview
//!
//! Programs describe their effects as [`Io`] values: deferred computations
//! with a success and a failure channel, composed by [`Io::map`],
//! [`Io::and_then`], [`Io::recover`], and the list combinators in [`io`].
//! Concurrency is actors: a process owns a typed [`Inbox`], other processes
//! hold typed [`Address`]es into it, and everything runs on one cooperative
//! scheduler that interleaves processes only at suspension points.
//!
//! # Core guarantees
//!
//! - **Deferred children**: [`spawn`] returns the child's address
//!   synchronously; the child body runs no earlier than the next scheduler
//!   turn, so a message sent right after spawning beats the child's first
//!   receive.
//! - **Sends never fail**: a send lands in the queue, hands off to the
//!   oldest parked waiter, or (when the target inbox is gone) is silently
//!   discarded. An actor is never failed by another actor's lifecycle.
//! - **On-exit exactly once**: every process posts its terminal result to
//!   its on-exit address exactly once, after the body finishes and before
//!   its inbox is torn down.
//! - **Mailbox invariant**: per inbox, queued messages and parked waiters
//!   are never both non-empty at a quiescent point; waiters resume oldest
//!   first.
//! - **No preemption, no cancellation**: processes yield only at receive,
//!   sleep, and fork/spawn boundaries, and always run to completion or
//!   failure.
//!
//! # Module structure
//!
//! - [`io`]: the deferred computation value and its combinators
//! - [`effect`]: print, sleep, exit primitives
//! - [`mailbox`]: inboxes, addresses, and delivery
//! - [`process`]: spawn, workers, request/reply
//! - [`promise`]: fork/join for deferred results
//! - [`machine`]: state-machine actors
//! - [`program`]: the entry harness and standard exit addresses
//! - [`runtime`]: the cooperative scheduler and clocks
//!
//! # Example
//!
//! ```ignore
//! use actio::{program, Inbox, Io};
//!
//! enum Greet {
//!     Say(String),
//! }
//!
//! fn main() {
//!     program(|inbox: Inbox<Greet>| {
//!         let hello = inbox.address_with(Greet::Say);
//!         hello
//!             .send("hello".to_string())
//!             .ignore_then(inbox.receive())
//!             .and_then(|Greet::Say(s)| actio::print(s))
//!     });
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

pub mod effect;
pub mod io;
pub mod machine;
pub mod mailbox;
pub mod process;
pub mod program;
pub mod promise;
pub mod runtime;
pub mod test_utils;
pub mod tracing_compat;
pub mod types;

pub(crate) mod util;

pub use effect::{exit, print, sleep};
pub use io::Io;
pub use machine::{spawn_machine, Machine};
pub use mailbox::{Address, Inbox};
pub use process::{call, defer_to, spawn, spawn_monitored, spawn_worker};
pub use program::{exit_on_error, log_on_error, program};
pub use promise::{fork, Promise};
pub use runtime::{Runtime, Time};
pub use types::{InboxId, ProcessId};
