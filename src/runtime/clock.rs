//! Runtime time: offsets from runtime start, on a wall or virtual clock.
//!
//! The production runtime measures time against a monotonic
//! [`std::time::Instant`] and blocks the thread when asked to advance past
//! the last pending work. The virtual clock fabricates the offset and jumps
//! straight to the requested deadline, which makes sleep-heavy scenarios
//! deterministic and instant under test.

use core::fmt;
use std::ops::Add;
use std::time::{Duration, Instant};

/// An instant on the runtime clock, measured as the offset from runtime
/// start.
///
/// A thin wrapper over [`Duration`]: ordering, arithmetic, and formatting
/// all come from the offset itself. Which clock produces the offset is the
/// scheduler's business, not the timestamp's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(Duration);

impl Time {
    /// Runtime start.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// An offset of `millis` milliseconds from runtime start.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// How much later `self` is than `earlier`; zero if it is not.
    #[must_use]
    pub fn since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl From<Duration> for Time {
    fn from(offset: Duration) -> Self {
        Self(offset)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Duration's debug form is already the human one ("25ms", "1.5s").
        write!(f, "{:?}", self.0)
    }
}

#[derive(Debug)]
pub(crate) enum Clock {
    Wall { origin: Instant },
    Virtual { now: Time },
}

impl Clock {
    pub(crate) fn wall() -> Self {
        Self::Wall {
            origin: Instant::now(),
        }
    }

    pub(crate) fn virtual_clock() -> Self {
        Self::Virtual { now: Time::ZERO }
    }

    /// Returns the current time on this clock.
    pub(crate) fn now(&self) -> Time {
        match self {
            Self::Wall { origin } => Time::from(origin.elapsed()),
            Self::Virtual { now } => *now,
        }
    }

    /// Advances the clock to `deadline`.
    ///
    /// The wall clock sleeps the remaining duration; the virtual clock jumps.
    /// Advancing to a deadline that already passed is a no-op.
    pub(crate) fn advance_to(&mut self, deadline: Time) {
        match self {
            Self::Wall { .. } => {
                let pause = deadline.since(self.now());
                if !pause.is_zero() {
                    std::thread::sleep(pause);
                }
            }
            Self::Virtual { now } => {
                if deadline > *now {
                    *now = deadline;
                }
            }
        }
    }
}
