//! Millisecond time base shared by the scheduler and state machine.
//!
//! The hardware timer advances a free-running `u32` millisecond counter that
//! wraps roughly every 49.7 days. Every comparison in the core goes through
//! [`Millis::has_reached`] / [`Millis::since`], which use wrapping
//! subtraction so deadlines stay correct across the wrap as long as they lie
//! less than `2^31` ms apart.

use core::fmt;
use core::ops::{Add, AddAssign};

use portable_atomic::{AtomicU32, Ordering};

/// Absolute point on the wrapping millisecond clock.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Millis(u32);

impl Millis {
    pub const ZERO: Self = Self(0);
    /// Largest representable tick value, used as the "never" sentinel for free slots.
    pub const MAX: Self = Self(u32::MAX);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs.wrapping_mul(1_000))
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Adds an offset, wrapping at the clock width.
    #[must_use]
    pub const fn wrapping_add(self, offset: u32) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Returns `true` once `self` is at or past `deadline`.
    ///
    /// The difference is interpreted as a signed quantity, so a deadline set
    /// just before the counter wraps is still reached just after it.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn has_reached(self, deadline: Millis) -> bool {
        (self.0.wrapping_sub(deadline.0) as i32) >= 0
    }

    /// Elapsed milliseconds from `earlier` to `self`, saturating at zero when
    /// `earlier` actually lies in the future.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn since(self, earlier: Millis) -> u32 {
        let delta = self.0.wrapping_sub(earlier.0) as i32;
        if delta < 0 { 0 } else { delta as u32 }
    }
}

impl Add<u32> for Millis {
    type Output = Millis;

    fn add(self, rhs: u32) -> Self::Output {
        self.wrapping_add(rhs)
    }
}

impl AddAssign<u32> for Millis {
    fn add_assign(&mut self, rhs: u32) {
        *self = self.wrapping_add(rhs);
    }
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Interrupt-driven millisecond counter.
///
/// The timer ISR (or a 1 ms ticker task) calls [`Clock::advance`]; the main
/// loop samples [`Clock::now`] before each scheduler pass.
pub struct Clock {
    ms: AtomicU32,
}

impl Clock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ms: AtomicU32::new(0),
        }
    }

    /// Starts the counter at an arbitrary value. Mostly useful for exercising wraparound.
    #[must_use]
    pub const fn starting_at(start: Millis) -> Self {
        Self {
            ms: AtomicU32::new(start.0),
        }
    }

    /// Advances the clock by one millisecond and returns the new value.
    pub fn advance(&self) -> Millis {
        Millis(self.ms.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    #[must_use]
    pub fn now(&self) -> Millis {
        Millis(self.ms.load(Ordering::Acquire))
    }

    pub fn reset(&self) {
        self.ms.store(0, Ordering::Release);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
