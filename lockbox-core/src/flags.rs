//! Pending stimulus flags deposited by interrupt handlers and event callbacks.
//!
//! A [`FlagSet`] is a small fixed-capacity set: each [`Flag`] appears at most
//! once and carries no payload, so it records "at least one occurrence" since
//! the last state transition. The state machine is the only consumer and it
//! clears the whole set on every accepted transition.
//!
//! Interrupt handlers reach the set through [`SharedFlags`], which guards the
//! backing array with a short critical section.

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;
use heapless::Vec;

/// Number of distinct flags a [`FlagSet`] holds before further stimuli are dropped.
pub const MAX_FLAGS: usize = 8;

/// Closed vocabulary of stimuli understood by the state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Flag {
    BoxMoved,
    DialRotated,
    DialPressed,
    TimerComplete,
    PhonePresent,
    PhoneNotPresent,
    BoxOpen,
    BoxClosed,
    AudioVolHigh,
    AudioMatch,
    AudioNoMatch,
    /// The lock countdown has run out.
    LockExpired,
}

impl Flag {
    /// Every flag in declaration order.
    pub const ALL: [Flag; 12] = [
        Flag::BoxMoved,
        Flag::DialRotated,
        Flag::DialPressed,
        Flag::TimerComplete,
        Flag::PhonePresent,
        Flag::PhoneNotPresent,
        Flag::BoxOpen,
        Flag::BoxClosed,
        Flag::AudioVolHigh,
        Flag::AudioMatch,
        Flag::AudioNoMatch,
        Flag::LockExpired,
    ];

    /// Stable kebab-case name used by the console and diagnostics output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Flag::BoxMoved => "box-moved",
            Flag::DialRotated => "dial-rotated",
            Flag::DialPressed => "dial-pressed",
            Flag::TimerComplete => "timer-complete",
            Flag::PhonePresent => "phone-present",
            Flag::PhoneNotPresent => "phone-not-present",
            Flag::BoxOpen => "box-open",
            Flag::BoxClosed => "box-closed",
            Flag::AudioVolHigh => "audio-vol-high",
            Flag::AudioMatch => "audio-match",
            Flag::AudioNoMatch => "audio-no-match",
            Flag::LockExpired => "lock-expired",
        }
    }

    /// Case-insensitive lookup by [`Flag::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unordered set of pending flags with a fixed slot budget.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlagSet<const N: usize = MAX_FLAGS> {
    slots: Vec<Flag, N>,
}

impl<const N: usize> FlagSet<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    #[must_use]
    pub fn has(&self, flag: Flag) -> bool {
        self.slots.contains(&flag)
    }

    /// Records `flag`.
    ///
    /// Returns `false` without touching the set when the flag is already
    /// present or when every slot is taken; a stimulus that does not fit is
    /// dropped.
    pub fn insert(&mut self, flag: Flag) -> bool {
        if self.has(flag) {
            return false;
        }
        self.slots.push(flag).is_ok()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.slots.iter().copied()
    }

    /// Returns `true` when at least one of `flags` is present.
    #[must_use]
    pub fn has_any(&self, flags: &[Flag]) -> bool {
        flags.iter().any(|flag| self.has(*flag))
    }

    /// Returns `true` when every one of `flags` is present.
    #[must_use]
    pub fn has_all(&self, flags: &[Flag]) -> bool {
        flags.iter().all(|flag| self.has(*flag))
    }
}

/// [`FlagSet`] shared between interrupt producers and the main-loop consumer.
///
/// Producers only ever call [`SharedFlags::insert`]; the main loop takes
/// snapshots and clears the set at transition time.
pub struct SharedFlags<const N: usize = MAX_FLAGS> {
    inner: Mutex<RefCell<FlagSet<N>>>,
}

impl<const N: usize> SharedFlags<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(FlagSet::new())),
        }
    }

    /// Inserts a flag with interrupts masked for the duration of the write.
    pub fn insert(&self, flag: Flag) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).insert(flag))
    }

    #[must_use]
    pub fn has(&self, flag: Flag) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).has(flag))
    }

    /// Copies the current contents so predicates can run outside the critical section.
    #[must_use]
    pub fn snapshot(&self) -> FlagSet<N> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).clone())
    }

    pub fn clear(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).clear());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_empty())
    }
}

impl<const N: usize> Default for SharedFlags<N> {
    fn default() -> Self {
        Self::new()
    }
}
