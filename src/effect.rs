//! Host effect primitives: print, sleep, exit.
//!
//! Thin [`Io`] wrappers over the environment. `print` and `sleep` are
//! infallible in the success channel; `exit` does not return and any
//! computation sequenced after it is unreachable.

use crate::Io;
use std::io::Write;
use std::time::Duration;

/// Writes `line` followed by a newline to standard output.
///
/// Infallible: a failed write is not an observable outcome of the
/// computation.
#[must_use]
pub fn print<E: 'static>(line: impl Into<String>) -> Io<(), E> {
    let line = line.into();
    Io::effect(move || {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{line}");
        Ok(())
    })
}

/// Suspends the current process for at least `duration`.
///
/// Under the wall clock the scheduler blocks the thread once no process is
/// ready; under the virtual clock time jumps, so the wait is exact and
/// instant.
#[must_use]
pub fn sleep<E: 'static>(duration: Duration) -> Io<(), E> {
    Io::from_fn(move |cx| {
        let timer = cx.sleep(duration);
        async move {
            timer.await;
            Ok(())
        }
    })
}

/// Terminates the host process with `status`.
#[must_use]
pub fn exit<A: 'static, E: 'static>(status: i32) -> Io<A, E> {
    Io::from_fn(move |_cx| async move { std::process::exit(status) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;

    #[test]
    fn print_succeeds() {
        let mut runtime = Runtime::with_virtual_clock();
        let result: Option<Result<(), String>> = runtime.drive(print("effect primitive check"));
        assert_eq!(result, Some(Ok(())));
    }

    #[test]
    fn sleep_is_sequenced() {
        let mut runtime = Runtime::with_virtual_clock();
        let io: Io<i32, String> = sleep(Duration::from_millis(3)).ignore_then(Io::succeed(9));
        assert_eq!(runtime.drive(io), Some(Ok(9)));
        assert!(runtime.now() >= crate::Time::from_millis(3));
    }
}
