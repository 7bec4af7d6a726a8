//! Edge-count knock detector fed by the audio threshold comparator.
//!
//! A pattern is [`KNOCK_TAPS`] taps whose first-to-last span falls inside
//! [`MIN_SPAN_MS`]..=[`MAX_SPAN_MS`]. Edges closer than [`DEBOUNCE_MS`] to the
//! previous tap belong to the same tap. A silence longer than [`TAP_GAP_MS`]
//! abandons a partial pattern, which then reads as a miss.

use core::cell::RefCell;

use critical_section::Mutex;
use lockbox_core::Millis;

pub const KNOCK_TAPS: u8 = 5;
pub const MIN_SPAN_MS: u32 = 800;
pub const MAX_SPAN_MS: u32 = 2_400;
pub const TAP_GAP_MS: u32 = 1_500;
pub const DEBOUNCE_MS: u32 = 40;

#[derive(Clone, Debug, Default)]
pub struct KnockCounter {
    taps: u8,
    first: Millis,
    last: Millis,
    verdict: Option<bool>,
}

impl KnockCounter {
    pub const fn new() -> Self {
        Self {
            taps: 0,
            first: Millis::ZERO,
            last: Millis::ZERO,
            verdict: None,
        }
    }

    pub fn record_edge(&mut self, now: Millis) {
        if self.taps > 0 {
            let gap = now.since(self.last);
            if gap < DEBOUNCE_MS {
                return;
            }
            if gap > TAP_GAP_MS {
                self.taps = 0;
            }
        }

        if self.taps == 0 {
            self.first = now;
        }
        self.taps += 1;
        self.last = now;

        if self.taps >= KNOCK_TAPS {
            let span = now.since(self.first);
            self.verdict = Some((MIN_SPAN_MS..=MAX_SPAN_MS).contains(&span));
            self.taps = 0;
        }
    }

    /// Completed verdict, or a miss for a pattern abandoned mid-way.
    pub fn take_verdict(&mut self, now: Millis) -> Option<bool> {
        if self.verdict.is_none() && self.taps > 0 && now.since(self.last) > TAP_GAP_MS {
            self.taps = 0;
            return Some(false);
        }
        self.verdict.take()
    }
}

/// [`KnockCounter`] written from the audio edge task and read by the board.
pub struct SharedKnock {
    inner: Mutex<RefCell<KnockCounter>>,
}

impl SharedKnock {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(KnockCounter::new())),
        }
    }

    pub fn record_edge(&self, now: Millis) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).record_edge(now));
    }

    pub fn take_verdict(&self, now: Millis) -> Option<bool> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take_verdict(now))
    }
}

impl Default for SharedKnock {
    fn default() -> Self {
        Self::new()
    }
}
