//! Per-state event sets.
//!
//! Entering a state registers exactly the events listed here, in order.
//! Every set keeps at least [`NFC_CHAIN_HEADROOM`] slots free so the NFC
//! chain can always register its follow-up step. Every locked set polls the
//! lock countdown.

use crate::config::{
    ALARM_FLASH_MS, ALARM_FLASHES, ARMING_GRACE_MS, AUDIO_POLL_MS, COUNTDOWN_POLL_MS,
    DIAL_POLL_MS, DISPLAY_REFRESH_MS, EMERGENCY_HOLD_MS, GREETING_FRAME_MS, GREETING_FRAMES,
    GREETING_MS, IDLE_TIMEOUT_MS, KNOCK_CAPTURE_MS, LID_POLL_MS, LOCKED_DISPLAY_TIMEOUT_MS,
    MOTION_POLL_MS, NFC_RESTART_MS, NOTIFICATION_TIMEOUT_MS, STATE_EVAL_ASLEEP_MS,
    STATE_EVAL_AWAKE_MS,
};
use crate::scheduler::{EventLabel, EventMode, MAX_EVENT_COUNT};
use crate::tasks::Task;

use super::BoxMode;

/// Slots every set leaves unused for the self-registering NFC chain.
pub const NFC_CHAIN_HEADROOM: usize = 2;

/// Upper bound on the length of any set.
pub const MAX_EVENT_SET: usize = MAX_EVENT_COUNT - NFC_CHAIN_HEADROOM;

/// One registration performed on state entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Registration {
    pub task: Task,
    pub mode: EventMode,
    pub delta: u16,
    pub repeats: u8,
}

impl Registration {
    #[must_use]
    pub const fn label(&self) -> EventLabel {
        self.task.label()
    }
}

const fn every(task: Task, delta: u16) -> Registration {
    Registration {
        task,
        mode: EventMode::Delta,
        delta,
        repeats: 0,
    }
}

const fn now_and_every(task: Task, delta: u16) -> Registration {
    Registration {
        task,
        mode: EventMode::DeltaImmediate,
        delta,
        repeats: 0,
    }
}

const fn after(task: Task, delta: u16) -> Registration {
    Registration {
        task,
        mode: EventMode::Single,
        delta,
        repeats: 0,
    }
}

const fn at_once(task: Task) -> Registration {
    Registration {
        task,
        mode: EventMode::SingleImmediate,
        delta: 0,
        repeats: 0,
    }
}

const fn burst(task: Task, repeats: u8, delta: u16) -> Registration {
    Registration {
        task,
        mode: EventMode::NRepeatImmediate,
        delta,
        repeats,
    }
}

const AWAKE_EVAL: Registration = every(Task::EvaluateStateMachine, STATE_EVAL_AWAKE_MS);
const ASLEEP_EVAL: Registration = every(Task::EvaluateStateMachine, STATE_EVAL_ASLEEP_MS);
const SCREEN: Registration = now_and_every(Task::RefreshDisplay, DISPLAY_REFRESH_MS);
const SCREEN_OFF: Registration = at_once(Task::RefreshDisplay);
const DIAL: Registration = every(Task::SampleDial, DIAL_POLL_MS);
const MOTION: Registration = every(Task::SampleMotion, MOTION_POLL_MS);
const LID: Registration = now_and_every(Task::SampleLid, LID_POLL_MS);
const AUDIO: Registration = every(Task::SampleAudio, AUDIO_POLL_MS);
const COUNTDOWN: Registration = now_and_every(Task::LockCountdown, COUNTDOWN_POLL_MS);
const NFC: Registration = after(Task::NfcStart, NFC_RESTART_MS);

static UNLOCKED_EMPTY_ASLEEP: [Registration; 4] = [ASLEEP_EVAL, MOTION, DIAL, SCREEN_OFF];

static UNLOCKED_ASLEEP_TO_AWAKE: [Registration; 3] = [
    AWAKE_EVAL,
    after(Task::TimerComplete, GREETING_MS),
    burst(Task::RefreshDisplay, GREETING_FRAMES, GREETING_FRAME_MS),
];

static UNLOCKED_EMPTY_AWAKE: [Registration; 4] = [
    AWAKE_EVAL,
    NFC,
    after(Task::TimerComplete, IDLE_TIMEOUT_MS),
    SCREEN,
];

static UNLOCKED_FULL_AWAKE: [Registration; 5] = [
    AWAKE_EVAL,
    NFC,
    DIAL,
    after(Task::TimerComplete, IDLE_TIMEOUT_MS),
    SCREEN,
];

static UNLOCKED_FULL_ASLEEP: [Registration; 5] = [ASLEEP_EVAL, NFC, MOTION, DIAL, SCREEN_OFF];

static UNLOCKED_TO_LOCKED_AWAKE: [Registration; 5] = [
    AWAKE_EVAL,
    NFC,
    LID,
    after(Task::TimerComplete, ARMING_GRACE_MS),
    SCREEN,
];

static LOCKED_FULL_AWAKE: [Registration; 6] = [
    AWAKE_EVAL,
    LID,
    AUDIO,
    COUNTDOWN,
    after(Task::TimerComplete, LOCKED_DISPLAY_TIMEOUT_MS),
    SCREEN,
];

static LOCKED_FULL_ASLEEP: [Registration; 6] = [
    ASLEEP_EVAL,
    LID,
    AUDIO,
    MOTION,
    COUNTDOWN,
    SCREEN_OFF,
];

static LOCKED_MONITOR_AWAKE: [Registration; 6] = [
    AWAKE_EVAL,
    LID,
    AUDIO,
    COUNTDOWN,
    after(Task::TimerComplete, KNOCK_CAPTURE_MS),
    SCREEN,
];

static LOCKED_MONITOR_ASLEEP: [Registration; 7] = [
    ASLEEP_EVAL,
    LID,
    AUDIO,
    MOTION,
    COUNTDOWN,
    after(Task::TimerComplete, KNOCK_CAPTURE_MS),
    SCREEN_OFF,
];

static LOCKED_NOTIFICATION: [Registration; 6] = [
    AWAKE_EVAL,
    LID,
    DIAL,
    COUNTDOWN,
    after(Task::TimerComplete, NOTIFICATION_TIMEOUT_MS),
    SCREEN,
];

static EMERGENCY_OPEN: [Registration; 3] = [
    AWAKE_EVAL,
    after(Task::TimerComplete, EMERGENCY_HOLD_MS),
    burst(Task::RefreshDisplay, ALARM_FLASHES, ALARM_FLASH_MS),
];

/// Events registered on entry to `mode`, in registration order.
#[must_use]
pub fn event_set(mode: BoxMode) -> &'static [Registration] {
    match mode {
        BoxMode::UnlockedEmptyAsleep => &UNLOCKED_EMPTY_ASLEEP,
        BoxMode::UnlockedAsleepToAwake => &UNLOCKED_ASLEEP_TO_AWAKE,
        BoxMode::UnlockedEmptyAwake => &UNLOCKED_EMPTY_AWAKE,
        BoxMode::UnlockedFullAwakeFuncA | BoxMode::UnlockedFullAwakeFuncB => &UNLOCKED_FULL_AWAKE,
        BoxMode::UnlockedFullAsleep => &UNLOCKED_FULL_ASLEEP,
        BoxMode::UnlockedToLockedAwake => &UNLOCKED_TO_LOCKED_AWAKE,
        BoxMode::LockedFullAwake => &LOCKED_FULL_AWAKE,
        BoxMode::LockedFullAsleep => &LOCKED_FULL_ASLEEP,
        BoxMode::LockedMonitorAwake => &LOCKED_MONITOR_AWAKE,
        BoxMode::LockedMonitorAsleep => &LOCKED_MONITOR_ASLEEP,
        BoxMode::LockedFullNotificationFuncA | BoxMode::LockedFullNotificationFuncB => {
            &LOCKED_NOTIFICATION
        }
        BoxMode::EmergencyOpen => &EMERGENCY_OPEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_set_leaves_room_for_nfc_chain() {
        for mode in BoxMode::ALL {
            assert!(
                event_set(mode).len() <= MAX_EVENT_SET,
                "{mode} registers too many events"
            );
        }
    }

    #[test]
    fn every_state_evaluates_itself_and_draws_the_screen() {
        for mode in BoxMode::ALL {
            let set = event_set(mode);
            let eval = set
                .iter()
                .find(|registration| registration.task == Task::EvaluateStateMachine)
                .unwrap();
            let expected = if mode.is_asleep() {
                STATE_EVAL_ASLEEP_MS
            } else {
                STATE_EVAL_AWAKE_MS
            };
            assert_eq!(eval.delta, expected, "{mode}");
            assert!(set.iter().any(|r| r.task == Task::RefreshDisplay), "{mode}");
        }
    }

    #[test]
    fn labels_are_unique_within_a_set() {
        for mode in BoxMode::ALL {
            let set = event_set(mode);
            for (index, registration) in set.iter().enumerate() {
                assert!(
                    set[index + 1..]
                        .iter()
                        .all(|other| other.label() != registration.label()),
                    "{mode} registers {} twice",
                    registration.label()
                );
            }
        }
    }

    #[test]
    fn asleep_states_blank_the_display_once() {
        for mode in BoxMode::ALL.into_iter().filter(|mode| mode.is_asleep()) {
            let screen = event_set(mode)
                .iter()
                .find(|registration| registration.task == Task::RefreshDisplay)
                .unwrap();
            assert_eq!(screen.mode, EventMode::SingleImmediate, "{mode}");
        }
    }

    #[test]
    fn every_locked_state_polls_the_countdown() {
        for mode in BoxMode::ALL {
            let countdown = event_set(mode)
                .iter()
                .find(|registration| registration.task == Task::LockCountdown);
            assert_eq!(countdown.is_some(), mode.is_locked(), "{mode}");
            if let Some(countdown) = countdown {
                assert_eq!(*countdown, COUNTDOWN, "{mode}");
            }
        }
    }
}
