//! Operations the scheduler can invoke.
//!
//! Scheduled callbacks are values of [`Task`] rather than function pointers.
//! [`LockBox`](crate::lockbox::LockBox) matches on the variant and runs the
//! corresponding collaborator step with access to the scheduler, the flag set
//! and the board.

use core::fmt;

use crate::scheduler::EventLabel;

/// Closed set of scheduled operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Task {
    EvaluateStateMachine,
    TimerComplete,
    NfcStart,
    NfcPoll,
    NfcRead,
    SampleDial,
    SampleMotion,
    SampleAudio,
    SampleLid,
    LockCountdown,
    RefreshDisplay,
}

impl Task {
    /// Event label this task is registered under.
    #[must_use]
    pub const fn label(self) -> EventLabel {
        match self {
            Task::EvaluateStateMachine => EventLabel::StateMachine,
            Task::TimerComplete => EventLabel::Timer,
            Task::NfcStart => EventLabel::NfcStart,
            Task::NfcPoll => EventLabel::NfcPoll,
            Task::NfcRead => EventLabel::NfcRead,
            Task::SampleDial => EventLabel::Dial,
            Task::SampleMotion => EventLabel::Motion,
            Task::SampleAudio => EventLabel::Audio,
            Task::SampleLid => EventLabel::Lid,
            Task::LockCountdown => EventLabel::Countdown,
            Task::RefreshDisplay => EventLabel::Display,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Task::EvaluateStateMachine => "evaluate-state-machine",
            Task::TimerComplete => "timer-complete",
            Task::NfcStart => "nfc-start",
            Task::NfcPoll => "nfc-poll",
            Task::NfcRead => "nfc-read",
            Task::SampleDial => "sample-dial",
            Task::SampleMotion => "sample-motion",
            Task::SampleAudio => "sample-audio",
            Task::SampleLid => "sample-lid",
            Task::LockCountdown => "lock-countdown",
            Task::RefreshDisplay => "refresh-display",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
