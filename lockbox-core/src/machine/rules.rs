//! Ordered transition table.
//!
//! Each state owns a slice of [`Rule`]s evaluated top to bottom against the
//! pending flags; the first rule whose predicate holds names the next state.
//! Every locked state lists its `BoxOpen` rule first so a forced lid always
//! wins over anything else pending, followed by `LockExpired` so the lock
//! ends on time whichever locked state the box is in.

use crate::flags::{Flag, FlagSet};

use super::BoxMode;

/// Condition over the pending flag set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    Has(Flag),
    Any(&'static [Flag]),
    All(&'static [Flag]),
}

impl Predicate {
    #[must_use]
    pub fn holds<const N: usize>(&self, flags: &FlagSet<N>) -> bool {
        match self {
            Predicate::Has(flag) => flags.has(*flag),
            Predicate::Any(set) => flags.has_any(set),
            Predicate::All(set) => flags.has_all(set),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rule {
    pub when: Predicate,
    pub next: BoxMode,
}

const fn on(flag: Flag, next: BoxMode) -> Rule {
    Rule {
        when: Predicate::Has(flag),
        next,
    }
}

const fn any(set: &'static [Flag], next: BoxMode) -> Rule {
    Rule {
        when: Predicate::Any(set),
        next,
    }
}

const fn all(set: &'static [Flag], next: BoxMode) -> Rule {
    Rule {
        when: Predicate::All(set),
        next,
    }
}

const WAKE: &[Flag] = &[Flag::BoxMoved, Flag::DialPressed, Flag::DialRotated];
const DIAL: &[Flag] = &[Flag::DialRotated, Flag::DialPressed];
const ABORT_LOCK: &[Flag] = &[Flag::BoxOpen, Flag::DialPressed];
const LID_SHUT_IN_TIME: &[Flag] = &[Flag::TimerComplete, Flag::BoxClosed];
const MONITOR_DONE: &[Flag] = &[Flag::AudioNoMatch, Flag::TimerComplete];

use BoxMode::{
    EmergencyOpen, LockedFullAsleep, LockedFullAwake, LockedFullNotificationFuncA,
    LockedFullNotificationFuncB, LockedMonitorAsleep, LockedMonitorAwake, UnlockedAsleepToAwake,
    UnlockedEmptyAsleep, UnlockedEmptyAwake, UnlockedFullAsleep, UnlockedFullAwakeFuncA,
    UnlockedFullAwakeFuncB, UnlockedToLockedAwake,
};

static UNLOCKED_EMPTY_ASLEEP: [Rule; 1] = [any(WAKE, UnlockedAsleepToAwake)];

static UNLOCKED_ASLEEP_TO_AWAKE: [Rule; 1] = [on(Flag::TimerComplete, UnlockedEmptyAwake)];

static UNLOCKED_EMPTY_AWAKE: [Rule; 2] = [
    on(Flag::PhonePresent, UnlockedFullAwakeFuncA),
    on(Flag::TimerComplete, UnlockedEmptyAsleep),
];

static UNLOCKED_FULL_AWAKE_FUNC_A: [Rule; 4] = [
    on(Flag::PhoneNotPresent, UnlockedEmptyAwake),
    on(Flag::DialPressed, UnlockedToLockedAwake),
    on(Flag::DialRotated, UnlockedFullAwakeFuncB),
    on(Flag::TimerComplete, UnlockedFullAsleep),
];

static UNLOCKED_FULL_AWAKE_FUNC_B: [Rule; 3] = [
    on(Flag::PhoneNotPresent, UnlockedEmptyAwake),
    any(DIAL, UnlockedFullAwakeFuncA),
    on(Flag::TimerComplete, UnlockedFullAsleep),
];

static UNLOCKED_FULL_ASLEEP: [Rule; 2] = [
    on(Flag::PhoneNotPresent, UnlockedEmptyAwake),
    any(WAKE, UnlockedFullAwakeFuncA),
];

static UNLOCKED_TO_LOCKED_AWAKE: [Rule; 3] = [
    on(Flag::PhoneNotPresent, UnlockedEmptyAwake),
    any(ABORT_LOCK, UnlockedFullAwakeFuncB),
    all(LID_SHUT_IN_TIME, LockedFullAwake),
];

static LOCKED_FULL_AWAKE: [Rule; 5] = [
    on(Flag::BoxOpen, EmergencyOpen),
    on(Flag::LockExpired, UnlockedFullAwakeFuncB),
    on(Flag::AudioMatch, LockedFullNotificationFuncA),
    on(Flag::AudioVolHigh, LockedMonitorAwake),
    on(Flag::TimerComplete, LockedFullAsleep),
];

static LOCKED_FULL_ASLEEP: [Rule; 5] = [
    on(Flag::BoxOpen, EmergencyOpen),
    on(Flag::LockExpired, UnlockedFullAwakeFuncB),
    on(Flag::AudioMatch, LockedFullNotificationFuncA),
    on(Flag::AudioVolHigh, LockedMonitorAsleep),
    any(WAKE, LockedFullAwake),
];

static LOCKED_MONITOR_AWAKE: [Rule; 4] = [
    on(Flag::BoxOpen, EmergencyOpen),
    on(Flag::LockExpired, UnlockedFullAwakeFuncB),
    on(Flag::AudioMatch, LockedFullNotificationFuncA),
    any(MONITOR_DONE, LockedFullAwake),
];

static LOCKED_MONITOR_ASLEEP: [Rule; 5] = [
    on(Flag::BoxOpen, EmergencyOpen),
    on(Flag::LockExpired, UnlockedFullAwakeFuncB),
    on(Flag::AudioMatch, LockedFullNotificationFuncA),
    any(MONITOR_DONE, LockedFullAsleep),
    any(WAKE, LockedMonitorAwake),
];

static LOCKED_FULL_NOTIFICATION_FUNC_A: [Rule; 5] = [
    on(Flag::BoxOpen, EmergencyOpen),
    on(Flag::LockExpired, UnlockedFullAwakeFuncB),
    on(Flag::DialPressed, UnlockedFullAwakeFuncB),
    on(Flag::DialRotated, LockedFullNotificationFuncB),
    on(Flag::TimerComplete, LockedFullAwake),
];

static LOCKED_FULL_NOTIFICATION_FUNC_B: [Rule; 5] = [
    on(Flag::BoxOpen, EmergencyOpen),
    on(Flag::LockExpired, UnlockedFullAwakeFuncB),
    on(Flag::DialPressed, LockedFullAwake),
    on(Flag::DialRotated, LockedFullNotificationFuncA),
    on(Flag::TimerComplete, LockedFullAwake),
];

static EMERGENCY_OPEN: [Rule; 1] = [on(Flag::TimerComplete, UnlockedFullAwakeFuncB)];

/// Transition rules for `mode`, highest priority first.
#[must_use]
pub fn rules(mode: BoxMode) -> &'static [Rule] {
    match mode {
        UnlockedEmptyAsleep => &UNLOCKED_EMPTY_ASLEEP,
        UnlockedAsleepToAwake => &UNLOCKED_ASLEEP_TO_AWAKE,
        UnlockedEmptyAwake => &UNLOCKED_EMPTY_AWAKE,
        UnlockedFullAwakeFuncA => &UNLOCKED_FULL_AWAKE_FUNC_A,
        UnlockedFullAwakeFuncB => &UNLOCKED_FULL_AWAKE_FUNC_B,
        UnlockedFullAsleep => &UNLOCKED_FULL_ASLEEP,
        UnlockedToLockedAwake => &UNLOCKED_TO_LOCKED_AWAKE,
        LockedFullAwake => &LOCKED_FULL_AWAKE,
        LockedFullAsleep => &LOCKED_FULL_ASLEEP,
        LockedMonitorAwake => &LOCKED_MONITOR_AWAKE,
        LockedMonitorAsleep => &LOCKED_MONITOR_ASLEEP,
        LockedFullNotificationFuncA => &LOCKED_FULL_NOTIFICATION_FUNC_A,
        LockedFullNotificationFuncB => &LOCKED_FULL_NOTIFICATION_FUNC_B,
        EmergencyOpen => &EMERGENCY_OPEN,
    }
}

/// Pure transition function: the target of the first matching rule, or
/// `current` when nothing matches.
#[must_use]
pub fn next_mode<const N: usize>(current: BoxMode, flags: &FlagSet<N>) -> BoxMode {
    rules(current)
        .iter()
        .find(|rule| rule.when.holds(flags))
        .map_or(current, |rule| rule.next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::MAX_FLAGS;

    fn flags(set: &[Flag]) -> FlagSet<MAX_FLAGS> {
        let mut flags = FlagSet::new();
        for flag in set {
            flags.insert(*flag);
        }
        flags
    }

    #[test]
    fn no_flags_means_no_transition() {
        for mode in BoxMode::ALL {
            assert_eq!(next_mode(mode, &FlagSet::<MAX_FLAGS>::new()), mode);
        }
    }

    #[test]
    fn box_open_wins_in_every_locked_state() {
        let everything = flags(&[
            Flag::AudioMatch,
            Flag::AudioVolHigh,
            Flag::TimerComplete,
            Flag::DialPressed,
            Flag::DialRotated,
            Flag::BoxMoved,
            Flag::LockExpired,
            Flag::BoxOpen,
        ]);
        for mode in BoxMode::ALL.into_iter().filter(|mode| mode.is_locked()) {
            assert_eq!(next_mode(mode, &everything), EmergencyOpen, "{mode}");
        }
    }

    #[test]
    fn lock_expiry_unlocks_from_every_locked_state() {
        let noisy = flags(&[
            Flag::AudioVolHigh,
            Flag::AudioNoMatch,
            Flag::TimerComplete,
            Flag::BoxMoved,
            Flag::DialPressed,
            Flag::LockExpired,
        ]);
        for mode in BoxMode::ALL.into_iter().filter(|mode| mode.is_locked()) {
            assert_eq!(next_mode(mode, &noisy), UnlockedFullAwakeFuncB, "{mode}");
            assert_eq!(rules(mode)[1], on(Flag::LockExpired, UnlockedFullAwakeFuncB), "{mode}");
        }
    }

    #[test]
    fn lock_expiry_means_nothing_outside_the_lock() {
        let expired = flags(&[Flag::LockExpired]);
        for mode in BoxMode::ALL.into_iter().filter(|mode| !mode.is_locked()) {
            assert_eq!(next_mode(mode, &expired), mode, "{mode}");
        }
    }

    #[test]
    fn phone_presence_beats_sleep_timeout() {
        let set = flags(&[Flag::TimerComplete, Flag::PhonePresent]);
        assert_eq!(next_mode(UnlockedEmptyAwake, &set), UnlockedFullAwakeFuncA);
    }

    #[test]
    fn locking_needs_timer_and_closed_lid() {
        assert_eq!(
            next_mode(UnlockedToLockedAwake, &flags(&[Flag::TimerComplete])),
            UnlockedToLockedAwake
        );
        assert_eq!(
            next_mode(
                UnlockedToLockedAwake,
                &flags(&[Flag::TimerComplete, Flag::BoxClosed])
            ),
            LockedFullAwake
        );
        assert_eq!(
            next_mode(
                UnlockedToLockedAwake,
                &flags(&[Flag::TimerComplete, Flag::BoxClosed, Flag::BoxOpen])
            ),
            UnlockedFullAwakeFuncB
        );
    }

    #[test]
    fn wake_stimuli_are_interchangeable() {
        for flag in WAKE {
            assert_eq!(
                next_mode(UnlockedEmptyAsleep, &flags(&[*flag])),
                UnlockedAsleepToAwake
            );
            assert_eq!(
                next_mode(LockedMonitorAsleep, &flags(&[*flag])),
                LockedMonitorAwake
            );
        }
    }

    #[test]
    fn notification_dial_toggles_selection() {
        let rotate = flags(&[Flag::DialRotated]);
        assert_eq!(
            next_mode(LockedFullNotificationFuncA, &rotate),
            LockedFullNotificationFuncB
        );
        assert_eq!(
            next_mode(LockedFullNotificationFuncB, &rotate),
            LockedFullNotificationFuncA
        );

        let press = flags(&[Flag::DialPressed]);
        assert_eq!(
            next_mode(LockedFullNotificationFuncA, &press),
            UnlockedFullAwakeFuncB
        );
        assert_eq!(next_mode(LockedFullNotificationFuncB, &press), LockedFullAwake);
    }

    #[test]
    fn every_rule_targets_a_different_state() {
        for mode in BoxMode::ALL {
            for rule in rules(mode) {
                assert_ne!(rule.next, mode, "{mode} has a self loop");
            }
        }
    }
}
