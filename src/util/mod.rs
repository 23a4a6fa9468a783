//! Internal utilities for the runtime.
//!
//! These utilities are intentionally dependency-free so the scheduler stays
//! deterministic and auditable.

pub mod table;

pub use table::{Handle, Table};
