//! Identifier types for runtime entities.
//!
//! Processes and inboxes are identified by stamped table handles. A stale
//! identifier (the entity was torn down) fails lookup instead of aliasing a
//! newer occupant of the same slot.

use crate::util::Handle;
use core::fmt;

/// A unique identifier for a running process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub(crate) Handle);

impl ProcessId {
    pub(crate) const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }

    pub(crate) const fn handle(self) -> Handle {
        self.0
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessId({}@{})", self.0.index(), self.0.stamp())
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0.index())
    }
}

/// A unique identifier for an inbox.
///
/// Addresses carry an `InboxId` rather than a reference; once the inbox is
/// deallocated the identifier goes stale and sends through it are discarded.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InboxId(pub(crate) Handle);

impl InboxId {
    pub(crate) const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }

    pub(crate) const fn handle(self) -> Handle {
        self.0
    }
}

impl fmt::Debug for InboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InboxId({}@{})", self.0.index(), self.0.stamp())
    }
}

impl fmt::Display for InboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Table;

    #[test]
    fn ids_render_compactly() {
        let mut table = Table::new();
        let first = InboxId::from_handle(table.claim(()));
        assert_eq!(first.to_string(), "I0");

        table.release(first.handle());
        let reused = ProcessId::from_handle(table.claim(()));
        assert_eq!(reused.to_string(), "P0");
        assert_ne!(format!("{first:?}"), format!("{:?}", InboxId(reused.0)));
    }
}
