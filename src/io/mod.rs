//! The deferred computation value.
//!
//! An [`Io<A, E>`] describes an effectful computation with two result
//! channels: success (`A`) and failure (`E`). Values are built by pure
//! construction and run only under the scheduler; running one twice requires
//! constructing it twice, and runs its effects twice.
//!
//! # Channels
//!
//! - [`Io::succeed`] and [`Io::fail`] introduce the two channels.
//! - [`Io::and_then`] and [`Io::map`] operate on the success channel; a
//!   failure passes through untouched and the continuation never runs.
//! - [`Io::recover`] and [`Io::map_err`] operate on the failure channel;
//!   `recover` is the only way a failure re-enters the success path, and it
//!   replaces the error type entirely.
//!
//! # Lists
//!
//! [`sequence`] and [`batch`] run left to right and stop at the first
//! failure; effects already run are not undone. [`concurrent`] schedules
//! every element as its own process and collects results in input order;
//! the first failure (in input order) is reported, and the remaining
//! elements still run to completion with their results discarded.
//!
//! # Suspension
//!
//! Only receive-on-empty, sleep, and the deferred first turn of a spawned
//! process yield to the scheduler. Everything else, including arbitrarily
//! long [`map`](Io::map) chains, runs without interruption.

use crate::runtime::{Cx, LocalBoxFuture};
use core::fmt;
use std::future::Future;

/// A deferred computation producing `A` or failing with `E`.
///
/// See the [module documentation](self) for the channel semantics.
pub struct Io<A, E> {
    thunk: Box<dyn FnOnce(Cx) -> LocalBoxFuture<Result<A, E>>>,
}

impl<A, E> fmt::Debug for Io<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Io").finish_non_exhaustive()
    }
}

impl<A: 'static, E: 'static> Io<A, E> {
    pub(crate) fn from_fn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<A, E>> + 'static,
    {
        Self {
            thunk: Box::new(move |cx| Box::pin(f(cx))),
        }
    }

    /// Starts the computation under the given capability handle.
    pub(crate) fn run(self, cx: Cx) -> LocalBoxFuture<Result<A, E>> {
        (self.thunk)(cx)
    }

    /// A computation that immediately yields `value`.
    #[must_use]
    pub fn succeed(value: A) -> Self {
        Self::from_fn(move |_cx| async move { Ok(value) })
    }

    /// A computation that immediately fails with `error`.
    ///
    /// The error never reaches an [`and_then`](Self::and_then) continuation;
    /// only [`recover`](Self::recover) or [`map_err`](Self::map_err) touch it.
    #[must_use]
    pub fn fail(error: E) -> Self {
        Self::from_fn(move |_cx| async move { Err(error) })
    }

    /// Lifts an already-computed `Result` into a computation.
    #[must_use]
    pub fn from_result(result: Result<A, E>) -> Self {
        Self::from_fn(move |_cx| async move { result })
    }

    /// Wraps a host-side operation as a computation.
    ///
    /// The closure runs when the computation runs, synchronously and without
    /// yielding. This is the entry point for custom effects.
    #[must_use]
    pub fn effect<F>(op: F) -> Self
    where
        F: FnOnce() -> Result<A, E> + 'static,
    {
        Self::from_fn(move |_cx| async move { op() })
    }

    /// Applies `f` to the success value. Failures pass through unchanged.
    #[must_use]
    pub fn map<B, F>(self, f: F) -> Io<B, E>
    where
        B: 'static,
        F: FnOnce(A) -> B + 'static,
    {
        Io::from_fn(move |cx| async move { self.run(cx).await.map(f) })
    }

    /// Sequences `f` after a success. On failure `f` never runs and the
    /// error passes through.
    #[must_use]
    pub fn and_then<B, F>(self, f: F) -> Io<B, E>
    where
        B: 'static,
        F: FnOnce(A) -> Io<B, E> + 'static,
    {
        Io::from_fn(move |cx| async move {
            match self.run(cx.clone()).await {
                Ok(value) => f(value).run(cx).await,
                Err(error) => Err(error),
            }
        })
    }

    /// Handles a failure. On success `handler` never runs and the value
    /// passes through.
    ///
    /// The result carries a fresh error type: recovering removes `E` by
    /// construction.
    #[must_use]
    pub fn recover<E2, H>(self, handler: H) -> Io<A, E2>
    where
        E2: 'static,
        H: FnOnce(E) -> Io<A, E2> + 'static,
    {
        Io::from_fn(move |cx| async move {
            match self.run(cx.clone()).await {
                Ok(value) => Ok(value),
                Err(error) => handler(error).run(cx).await,
            }
        })
    }

    /// Maps over the failure channel. Successes pass through unchanged.
    #[must_use]
    pub fn map_err<E2, G>(self, g: G) -> Io<A, E2>
    where
        E2: 'static,
        G: FnOnce(E) -> E2 + 'static,
    {
        Io::from_fn(move |cx| async move { self.run(cx).await.map_err(g) })
    }

    /// Applicative application: `self` yields a function, `arg` its argument.
    ///
    /// Equivalent to `self.and_then(|f| arg.map(f))`: the function side runs
    /// first, then the argument, sequentially.
    #[must_use]
    pub fn and_map<Arg, B>(self, arg: Io<Arg, E>) -> Io<B, E>
    where
        A: FnOnce(Arg) -> B,
        Arg: 'static,
        B: 'static,
    {
        self.and_then(|f| arg.map(f))
    }

    /// Runs `self`, then `next`, keeping `self`'s value.
    #[must_use]
    pub fn then_ignore<B>(self, next: Io<B, E>) -> Io<A, E>
    where
        B: 'static,
    {
        self.and_then(|value| next.map(move |_| value))
    }

    /// Runs `self`, then `next`, keeping `next`'s value.
    #[must_use]
    pub fn ignore_then<B>(self, next: Io<B, E>) -> Io<B, E>
    where
        B: 'static,
    {
        self.and_then(move |_| next)
    }
}

impl<E: 'static> Io<(), E> {
    /// The unit computation: succeeds immediately with `()`.
    #[must_use]
    pub fn none() -> Self {
        Self::succeed(())
    }
}

/// Lifts a binary function over two computations.
///
/// The arguments run **sequentially, left to right**, observable when they
/// have side effects. Use [`concurrent`] for interleaved scheduling.
#[must_use]
pub fn map2<A1, A2, B, E, F>(f: F, first: Io<A1, E>, second: Io<A2, E>) -> Io<B, E>
where
    A1: 'static,
    A2: 'static,
    B: 'static,
    E: 'static,
    F: FnOnce(A1, A2) -> B + 'static,
{
    Io::from_fn(move |cx| async move {
        let a = first.run(cx.clone()).await?;
        let b = second.run(cx).await?;
        Ok(f(a, b))
    })
}

/// Lifts a ternary function over three computations, sequentially.
#[must_use]
pub fn map3<A1, A2, A3, B, E, F>(
    f: F,
    first: Io<A1, E>,
    second: Io<A2, E>,
    third: Io<A3, E>,
) -> Io<B, E>
where
    A1: 'static,
    A2: 'static,
    A3: 'static,
    B: 'static,
    E: 'static,
    F: FnOnce(A1, A2, A3) -> B + 'static,
{
    Io::from_fn(move |cx| async move {
        let a = first.run(cx.clone()).await?;
        let b = second.run(cx.clone()).await?;
        let c = third.run(cx).await?;
        Ok(f(a, b, c))
    })
}

/// Lifts a quaternary function over four computations, sequentially.
#[must_use]
pub fn map4<A1, A2, A3, A4, B, E, F>(
    f: F,
    first: Io<A1, E>,
    second: Io<A2, E>,
    third: Io<A3, E>,
    fourth: Io<A4, E>,
) -> Io<B, E>
where
    A1: 'static,
    A2: 'static,
    A3: 'static,
    A4: 'static,
    B: 'static,
    E: 'static,
    F: FnOnce(A1, A2, A3, A4) -> B + 'static,
{
    Io::from_fn(move |cx| async move {
        let a = first.run(cx.clone()).await?;
        let b = second.run(cx.clone()).await?;
        let c = third.run(cx.clone()).await?;
        let d = fourth.run(cx).await?;
        Ok(f(a, b, c, d))
    })
}

/// Runs each computation in order, discarding values.
///
/// Stops at the first failure; later elements never run. The empty list
/// yields `Ok(())`.
#[must_use]
pub fn batch<A, E>(items: Vec<Io<A, E>>) -> Io<(), E>
where
    A: 'static,
    E: 'static,
{
    Io::from_fn(move |cx| async move {
        for item in items {
            item.run(cx.clone()).await?;
        }
        Ok(())
    })
}

/// Runs each computation in order, collecting the values.
///
/// Stops at the first failure; effects already run are not undone. The empty
/// list yields `Ok(vec![])`.
#[must_use]
pub fn sequence<A, E>(items: Vec<Io<A, E>>) -> Io<Vec<A>, E>
where
    A: 'static,
    E: 'static,
{
    Io::from_fn(move |cx| async move {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(item.run(cx.clone()).await?);
        }
        Ok(values)
    })
}

/// Runs the computations interleaved, collecting results in input order.
///
/// Each element is forked into its own process and the promises are joined
/// in input order, so the result order never depends on completion order.
/// The first failure in input order is reported; the other elements are not
/// cancelled and still run to completion, with their results discarded.
///
/// The empty list yields `Ok(vec![])`.
#[must_use]
pub fn concurrent<A, E>(items: Vec<Io<A, E>>) -> Io<Vec<A>, E>
where
    A: 'static,
    E: 'static,
{
    Io::from_fn(move |cx| async move {
        let promises: Vec<_> = items
            .into_iter()
            .map(|item| crate::promise::fork_with(&cx, item))
            .collect();
        let mut values = Vec::with_capacity(promises.len());
        for promise in promises {
            values.push(promise.into_result().await?);
        }
        Ok(values)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn drive<A: 'static>(io: Io<A, String>) -> Result<A, String> {
        Runtime::with_virtual_clock()
            .drive(io)
            .expect("computation parked forever")
    }

    fn effect_log() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Io<i32, String>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let record = move |label: &'static str| {
            let sink = Rc::clone(&sink);
            Io::effect(move || {
                sink.borrow_mut().push(label);
                Ok(label.len() as i32)
            })
        };
        (log, record)
    }

    #[test]
    fn and_then_on_succeed_runs_the_continuation() {
        let result = drive(Io::succeed(2).and_then(|n| Io::succeed(n * 3)));
        assert_eq!(result, Ok(6));
    }

    #[test]
    fn and_then_skips_the_continuation_on_failure() {
        let (log, record) = effect_log();
        let io = Io::fail("boom".to_string()).and_then(move |()| record("unreachable"));
        assert_eq!(drive(io), Err("boom".to_string()));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn recover_handles_the_failure() {
        let result = drive(Io::<i32, String>::fail("boom".to_string()).recover(|e| {
            assert_eq!(e, "boom");
            Io::succeed(42)
        }));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn recover_passes_success_through() {
        let (log, record) = effect_log();
        let io = Io::succeed(1).recover(move |_e: String| record("unreachable"));
        assert_eq!(drive(io), Ok(1));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn map_agrees_with_and_then_of_succeed() {
        let via_map = drive(Io::succeed(5).map(|n| n + 1));
        let via_and_then = drive(Io::succeed(5).and_then(|n| Io::succeed(n + 1)));
        assert_eq!(via_map, via_and_then);
    }

    #[test]
    fn map_err_rewrites_the_error_channel() {
        let result: Result<i32, String> =
            drive(Io::fail(7).map_err(|code: i32| format!("code {code}")));
        assert_eq!(result, Err("code 7".to_string()));
    }

    #[test]
    fn and_map_applies_function_then_argument() {
        let (log, record) = effect_log();
        let sink = Rc::clone(&log);
        let function: Io<_, String> = Io::effect(move || {
            sink.borrow_mut().push("fn");
            Ok(|n: i32| n * 2)
        });
        let io = function.and_map(record("arg"));
        assert_eq!(drive(io), Ok(6));
        assert_eq!(*log.borrow(), vec!["fn", "arg"]);
    }

    #[test]
    fn map2_runs_left_to_right() {
        let (log, record) = effect_log();
        let io = map2(|a, b| a + b, record("aa"), record("b"));
        assert_eq!(drive(io), Ok(3));
        assert_eq!(*log.borrow(), vec!["aa", "b"]);
    }

    #[test]
    fn map3_and_map4_collect_in_order() {
        let io = map3(|a, b, c| vec![a, b, c], Io::succeed(1), Io::succeed(2), Io::succeed(3));
        assert_eq!(drive(io), Ok(vec![1, 2, 3]));

        let io = map4(
            |a, b, c, d| a + b + c + d,
            Io::succeed(1),
            Io::succeed(2),
            Io::succeed(3),
            Io::succeed(4),
        );
        assert_eq!(drive(io), Ok(10));
    }

    #[test]
    fn sequence_collects_in_order_and_fails_fast() {
        let (log, record) = effect_log();
        let io = sequence(vec![record("a"), record("bb")]);
        assert_eq!(drive(io), Ok(vec![1, 2]));

        let io = sequence(vec![
            record("c"),
            Io::fail("stop".to_string()),
            record("never"),
        ]);
        assert_eq!(drive(io), Err("stop".to_string()));
        assert_eq!(*log.borrow(), vec!["a", "bb", "c"]);
    }

    #[test]
    fn batch_discards_values_and_fails_fast() {
        let (log, record) = effect_log();
        let io = batch(vec![record("a"), record("b")]);
        assert_eq!(drive(io), Ok(()));

        let io = batch(vec![Io::fail("stop".to_string()), record("never")]);
        assert_eq!(drive(io), Err("stop".to_string()));
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn empty_lists_yield_their_units() {
        assert_eq!(drive(sequence(Vec::<Io<i32, String>>::new())), Ok(vec![]));
        assert_eq!(drive(batch(Vec::<Io<i32, String>>::new())), Ok(()));
        assert_eq!(drive(concurrent(Vec::<Io<i32, String>>::new())), Ok(vec![]));
    }

    #[test]
    fn concurrent_preserves_input_order() {
        let io = concurrent(vec![Io::succeed(1), Io::succeed(2), Io::succeed(3)]);
        assert_eq!(drive(io), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn then_ignore_and_ignore_then_pick_the_right_value() {
        let io = Io::succeed("kept").then_ignore(Io::<i32, String>::succeed(0).map(|_| 0));
        assert_eq!(drive(io.map(String::from)), Ok("kept".to_string()));

        let io = Io::<i32, String>::succeed(0).ignore_then(Io::succeed("next"));
        assert_eq!(drive(io.map(String::from)), Ok("next".to_string()));
    }

    #[test]
    fn from_result_round_trips() {
        assert_eq!(drive(Io::from_result(Ok(1))), Ok(1));
        assert_eq!(
            drive(Io::<i32, String>::from_result(Err("e".to_string()))),
            Err("e".to_string())
        );
    }
}
