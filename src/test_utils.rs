//! Shared helpers for tests.
//!
//! - Logging initialization that respects the `tracing-integration` feature
//! - Phase/completion macros for readable test output
//! - A deterministic runtime constructor
//!
//! Without `tracing-integration` everything here compiles to (almost)
//! nothing, so plain `cargo test` stays quiet.

use crate::Runtime;

/// Initialize test logging.
///
/// Safe to call multiple times; only the first call initializes. A no-op
/// unless `tracing-integration` is enabled.
#[cfg(feature = "tracing-integration")]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Initialize test logging (no-op without `tracing-integration`).
#[cfg(not(feature = "tracing-integration"))]
pub fn init_test_logging() {}

/// A deterministic virtual-clock runtime for scenario tests.
#[must_use]
pub fn test_runtime() -> Runtime {
    Runtime::with_virtual_clock()
}

/// Log a test phase transition.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        $crate::tracing_compat::info!(phase = %$name, "TEST PHASE: {}", $name);
    };
}

/// Log test completion.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        $crate::tracing_compat::info!(test = %$name, "test completed: {}", $name);
    };
}

/// Log expected/actual context before asserting.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        $crate::tracing_compat::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
