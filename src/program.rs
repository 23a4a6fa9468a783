//! Program entry harness and the standard exit addresses.
//!
//! [`program`] is the bridge between `fn main` and the actor world: it
//! builds a wall-clock runtime, spawns the root actor with
//! [`exit_on_error`] as its on-exit address, and runs the scheduler until no
//! process is ready and no timer is pending.
//!
//! The standard addresses are synthetic (they carry a direct handler
//! instead of an inbox) and are safe to hand to any number of concurrent
//! spawns.

use crate::mailbox::{Address, Inbox};
use crate::runtime::Runtime;
use crate::tracing_compat::error;
use crate::Io;
use core::fmt;
use std::io::Write;

/// Runs a root actor to completion.
///
/// Creates the root inbox, spawns `root` with [`exit_on_error`] as its
/// on-exit address, and drives the scheduler until idle. A root failure
/// prints the error to standard error and terminates the host process with
/// status −1; a root success lets `program` return normally.
pub fn program<M, F>(root: F)
where
    M: 'static,
    F: FnOnce(Inbox<M>) -> Io<(), String> + 'static,
{
    let mut runtime = Runtime::new();
    runtime.spawn(root, exit_on_error());
    runtime.run_until_idle();
}

/// An address that terminates the host process on failure.
///
/// On `Err(e)`: prints `e` to standard error and exits with status −1.
/// On `Ok(_)`: does nothing.
#[must_use]
pub fn exit_on_error<A, E>() -> Address<Result<A, E>>
where
    A: 'static,
    E: fmt::Display + 'static,
{
    Address::from_handler(|result: Result<A, E>| {
        if let Err(e) = result {
            write_error_line(&e);
            std::process::exit(-1);
        }
    })
}

/// An address that logs failures and otherwise does nothing.
///
/// On `Err(e)`: prints `e` to standard error. On `Ok(_)`: does nothing.
#[must_use]
pub fn log_on_error<A, E>() -> Address<Result<A, E>>
where
    A: 'static,
    E: fmt::Display + 'static,
{
    Address::from_handler(|result: Result<A, E>| {
        if let Err(e) = result {
            write_error_line(&e);
        }
    })
}

fn write_error_line(e: &impl fmt::Display) {
    error!(error = %e, "process failed");
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle, "{e}");
}
