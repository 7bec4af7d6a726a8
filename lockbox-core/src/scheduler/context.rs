//! Packed 16-bit event context.
//!
//! Non-repeating events store their delay in all 16 bits. Repeating events
//! split the word: the high byte counts remaining firings and the low byte
//! holds the delay, clamped to [`EventContext::MAX_REPEAT_DELAY`].

use core::fmt;

/// Raw 16-bit payload carried by every scheduled event.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct EventContext(u16);

impl EventContext {
    pub const ZERO: Self = Self(0);
    /// Largest delay a repeating event can carry in its low byte.
    pub const MAX_REPEAT_DELAY: u16 = 0x00FF;

    const DELAY_MASK: u16 = 0x00FF;
    const REPEAT_SHIFT: u32 = 8;

    /// Context for a one-shot or periodic event: the whole word is the delay.
    #[must_use]
    pub const fn delay(delay: u16) -> Self {
        Self(delay)
    }

    /// Packs a repeat count and a delay, clamping the delay to 255 ms.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn repeating(repeats: u8, delay: u16) -> Self {
        let delay = if delay > Self::MAX_REPEAT_DELAY {
            Self::MAX_REPEAT_DELAY
        } else {
            delay
        };
        Self(((repeats as u16) << Self::REPEAT_SHIFT) | delay)
    }

    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Remaining firings encoded in the high byte.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn repeats(self) -> u8 {
        (self.0 >> Self::REPEAT_SHIFT) as u8
    }

    /// Delay encoded in the low byte of a repeating context.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn repeat_delay(self) -> u8 {
        (self.0 & Self::DELAY_MASK) as u8
    }

    /// Replaces the repeat count, keeping the packed delay.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn with_repeats(self, repeats: u8) -> Self {
        Self(((repeats as u16) << Self::REPEAT_SHIFT) | (self.0 & Self::DELAY_MASK))
    }

    /// Drops the repeat count so only the low-byte delay remains.
    #[must_use]
    pub const fn strip_repeats(self) -> Self {
        Self(self.0 & Self::DELAY_MASK)
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
