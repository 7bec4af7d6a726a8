//! The assembled controller.
//!
//! [`LockBox`] owns the scheduler, the state machine, the sensor trackers,
//! the diagnostics journal and the board, and borrows the flag set that
//! interrupt handlers write into. The main loop calls [`LockBox::tick`] with
//! the current clock value; everything else happens inside scheduled
//! [`Task`]s.

use crate::config::Config;
use crate::flags::{Flag, SharedFlags};
use crate::hal::{BoxHardware, Screen};
use crate::journal::{Journal, RecordKind};
use crate::machine::{BoxMode, BoxState, MachineError, Rejection, StateMachine, Transition};
use crate::scheduler::{RegisterError, Scheduler};
use crate::sensors::{DialTracker, MotionTracker, NfcPoller, NfcStep};
use crate::tasks::Task;
use crate::time::Millis;

pub struct LockBox<'f, H> {
    scheduler: Scheduler<Task>,
    parts: Parts<'f, H>,
}

/// Everything a task may touch besides the scheduler, split out so the
/// scheduler can lend itself to the dispatcher.
struct Parts<'f, H> {
    flags: &'f SharedFlags,
    machine: StateMachine,
    dial: DialTracker,
    motion: MotionTracker,
    nfc: NfcPoller,
    phone: Option<bool>,
    config: Config,
    journal: Journal,
    hardware: H,
}

impl<'f, H: BoxHardware> LockBox<'f, H> {
    /// Builds a controller parked in the initial mode. Nothing is scheduled
    /// until [`LockBox::start`] runs.
    pub fn new(flags: &'f SharedFlags, hardware: H, config: Config) -> Self {
        Self {
            scheduler: Scheduler::new(),
            parts: Parts {
                flags,
                machine: StateMachine::new(),
                dial: DialTracker::new(),
                motion: MotionTracker::new(),
                nfc: NfcPoller::new(),
                phone: None,
                config,
                journal: Journal::new(),
                hardware,
            },
        }
    }

    /// Power-up: clears the scheduler and flags, releases the solenoid and
    /// enters the initial mode with its event set.
    pub fn start(&mut self, now: Millis) {
        let parts = &mut self.parts;
        let rejected = parts
            .machine
            .reset(now, parts.flags, &mut self.scheduler, &mut parts.hardware);
        parts
            .journal
            .record(now, RecordKind::Started(parts.machine.mode()));
        parts.record_rejections(now, &rejected);
    }

    /// Runs one scheduler pass and returns the number of tasks executed.
    pub fn tick(&mut self, now: Millis) -> usize {
        let parts = &mut self.parts;
        self.scheduler
            .tick(now, |scheduler, task| parts.run(task, now, scheduler))
    }

    /// Forces the machine into the mode with index `raw` through the regular
    /// transition path. Unknown indices leave everything untouched.
    pub fn goto(&mut self, raw: u8, now: Millis) -> Result<BoxMode, MachineError> {
        let parts = &mut self.parts;
        match parts.machine.goto(
            raw,
            now,
            parts.flags,
            &mut self.scheduler,
            &parts.config,
            &mut parts.hardware,
        ) {
            Ok(transition) => {
                parts.record_transition(&transition);
                Ok(transition.to)
            }
            Err(error) => {
                parts.journal.record(now, RecordKind::UnrecognizedState(raw));
                Err(error)
            }
        }
    }

    #[must_use]
    pub fn mode(&self) -> BoxMode {
        self.parts.machine.mode()
    }

    #[must_use]
    pub fn state(&self) -> &BoxState {
        self.parts.machine.state()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<Task> {
        &self.scheduler
    }

    #[must_use]
    pub fn flags(&self) -> &'f SharedFlags {
        self.parts.flags
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.parts.journal
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.parts.config
    }

    /// Last phone scan result, `None` before the first read.
    #[must_use]
    pub fn phone_detected(&self) -> Option<bool> {
        self.parts.phone
    }

    #[must_use]
    pub fn nfc(&self) -> &NfcPoller {
        &self.parts.nfc
    }

    #[must_use]
    pub fn hardware(&self) -> &H {
        &self.parts.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.parts.hardware
    }

    /// Screen the current mode would show at `now`.
    #[must_use]
    pub fn screen(&self, now: Millis) -> Screen {
        screen_for(self.state(), now, &self.parts.config)
    }
}

impl<H: BoxHardware> Parts<'_, H> {
    fn run(&mut self, task: Task, now: Millis, scheduler: &mut Scheduler<Task>) {
        match task {
            Task::EvaluateStateMachine => {
                if let Some(transition) = self.machine.run(
                    now,
                    self.flags,
                    scheduler,
                    &self.config,
                    &mut self.hardware,
                ) {
                    self.record_transition(&transition);
                }
            }
            Task::TimerComplete => {
                self.flags.insert(Flag::TimerComplete);
            }
            Task::NfcStart => {
                let step = self.nfc.start(&mut self.hardware, scheduler, &self.config);
                self.nfc_step(task, now, step);
            }
            Task::NfcPoll => {
                let step = self.nfc.poll(&mut self.hardware, scheduler, &self.config);
                self.nfc_step(task, now, step);
            }
            Task::NfcRead => {
                let step = self.nfc.read(&mut self.hardware, scheduler);
                self.nfc_step(task, now, step);
            }
            Task::SampleDial => {
                if self.dial.update(self.hardware.position()) {
                    self.flags.insert(Flag::DialRotated);
                }
            }
            Task::SampleMotion => {
                let Some(sample) = self.hardware.sample() else {
                    return;
                };
                if self.motion.update(sample, self.config.motion_threshold) {
                    self.flags.insert(Flag::BoxMoved);
                }
            }
            Task::SampleAudio => match self.hardware.verdict() {
                Some(true) => {
                    self.flags.insert(Flag::AudioMatch);
                }
                Some(false) => {
                    self.flags.insert(Flag::AudioNoMatch);
                }
                None => {}
            },
            Task::SampleLid => {
                let flag = if self.hardware.is_open() {
                    Flag::BoxOpen
                } else {
                    Flag::BoxClosed
                };
                self.flags.insert(flag);
            }
            Task::LockCountdown => {
                if self.machine.state().countdown_expired(now) {
                    self.flags.insert(Flag::LockExpired);
                }
            }
            Task::RefreshDisplay => {
                let screen = screen_for(self.machine.state(), now, &self.config);
                self.hardware.render(screen);
            }
        }
    }

    fn nfc_step(&mut self, task: Task, now: Millis, step: Result<NfcStep, RegisterError>) {
        match step {
            Ok(NfcStep::Read(present)) => {
                self.flags.insert(if present {
                    Flag::PhonePresent
                } else {
                    Flag::PhoneNotPresent
                });
                if self.phone != Some(present) {
                    self.phone = Some(present);
                    self.journal.record(now, RecordKind::PhoneScan { present });
                }
            }
            Ok(_) => {}
            Err(error) => {
                self.journal.record(
                    now,
                    RecordKind::RegisterRejected {
                        label: task.label(),
                        error,
                    },
                );
            }
        }
    }

    fn record_transition(&mut self, transition: &Transition) {
        self.journal.record(
            transition.at,
            RecordKind::Transition {
                from: transition.from,
                to: transition.to,
            },
        );
        self.record_rejections(transition.at, &transition.rejected);
    }

    fn record_rejections(&mut self, now: Millis, rejected: &[Rejection]) {
        for rejection in rejected {
            self.journal.record(
                now,
                RecordKind::RegisterRejected {
                    label: rejection.label,
                    error: rejection.error,
                },
            );
        }
    }
}

/// Logical screen for `state` at `now`.
#[must_use]
pub fn screen_for(state: &BoxState, now: Millis, config: &Config) -> Screen {
    let remaining_secs = state
        .countdown_remaining(now)
        .unwrap_or(0)
        .div_ceil(1_000);

    match state.mode {
        BoxMode::UnlockedEmptyAsleep
        | BoxMode::UnlockedFullAsleep
        | BoxMode::LockedFullAsleep
        | BoxMode::LockedMonitorAsleep => Screen::Off,
        BoxMode::UnlockedAsleepToAwake => Screen::Greeting,
        BoxMode::UnlockedEmptyAwake => Screen::InsertPhone,
        BoxMode::UnlockedFullAwakeFuncA => Screen::LockPrompt {
            lock_secs: config.lock_duration_ms.div_ceil(1_000),
        },
        BoxMode::UnlockedFullAwakeFuncB => Screen::Unlocked,
        BoxMode::UnlockedToLockedAwake => Screen::Arming,
        BoxMode::LockedFullAwake => Screen::Locked { remaining_secs },
        BoxMode::LockedMonitorAwake => Screen::Listening { remaining_secs },
        BoxMode::LockedFullNotificationFuncA => Screen::Notification {
            unlock_selected: true,
        },
        BoxMode::LockedFullNotificationFuncB => Screen::Notification {
            unlock_selected: false,
        },
        BoxMode::EmergencyOpen => Screen::ForceOpen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::NoopHardware;
    use crate::journal::Severity;
    use crate::machine::InterruptMask;
    use crate::scheduler::{EventLabel, EventMode};

    #[test]
    fn locked_screen_rounds_remaining_time_up() {
        let state = BoxState {
            mode: BoxMode::LockedFullAwake,
            mask: InterruptMask::AUDIO_ONLY,
            countdown: Some(Millis::new(10_000)),
        };
        let config = Config::default();
        assert_eq!(
            screen_for(&state, Millis::new(1), &config),
            Screen::Locked { remaining_secs: 10 }
        );
        assert_eq!(
            screen_for(&state, Millis::new(9_001), &config),
            Screen::Locked { remaining_secs: 1 }
        );
        assert_eq!(
            screen_for(&state, Millis::new(12_000), &config),
            Screen::Locked { remaining_secs: 0 }
        );
    }

    #[test]
    fn start_registers_initial_event_set() {
        let flags = SharedFlags::new();
        let mut lockbox = LockBox::new(&flags, NoopHardware::new(), Config::default());
        lockbox.start(Millis::ZERO);

        assert_eq!(lockbox.mode(), BoxMode::UnlockedEmptyAsleep);
        assert_eq!(
            lockbox.scheduler().len(),
            crate::machine::events::event_set(BoxMode::UnlockedEmptyAsleep).len()
        );
        assert!(matches!(
            lockbox.journal().latest().map(|record| record.kind),
            Some(RecordKind::Started(BoxMode::UnlockedEmptyAsleep))
        ));
    }

    #[test]
    fn disabled_registration_is_journaled_as_an_error() {
        let flags = SharedFlags::new();
        let mut lockbox = LockBox::new(&flags, NoopHardware::new(), Config::default());
        lockbox.start(Millis::ZERO);

        let error = lockbox
            .scheduler
            .register(
                Task::TimerComplete,
                EventLabel::Timer,
                EventMode::Disabled,
                0,
                0,
            )
            .unwrap_err();
        assert_eq!(error, RegisterError::InvalidMode);

        let now = Millis::new(5);
        lockbox.parts.record_rejections(
            now,
            &[Rejection {
                label: EventLabel::Timer,
                error,
            }],
        );

        let record = lockbox.journal().latest().unwrap();
        assert_eq!(record.at, now);
        assert_eq!(
            record.kind,
            RecordKind::RegisterRejected {
                label: EventLabel::Timer,
                error: RegisterError::InvalidMode,
            }
        );
        assert_eq!(record.kind.severity(), Severity::Error);
    }

    #[test]
    fn expired_countdown_raises_lock_expired() {
        let flags = SharedFlags::new();
        let config = Config::default().with_lock_duration(1_000);
        let mut lockbox = LockBox::new(&flags, NoopHardware::new(), config);
        lockbox.start(Millis::ZERO);
        lockbox
            .goto(BoxMode::UnlockedToLockedAwake.index(), Millis::ZERO)
            .unwrap();
        flags.insert(Flag::TimerComplete);
        flags.insert(Flag::BoxClosed);
        lockbox
            .parts
            .run(Task::EvaluateStateMachine, Millis::new(10), &mut lockbox.scheduler);
        assert_eq!(lockbox.mode(), BoxMode::LockedFullAwake);

        lockbox
            .parts
            .run(Task::LockCountdown, Millis::new(1_009), &mut lockbox.scheduler);
        assert!(!flags.has(Flag::LockExpired));
        lockbox
            .parts
            .run(Task::LockCountdown, Millis::new(1_010), &mut lockbox.scheduler);
        assert!(flags.has(Flag::LockExpired));
        assert!(!flags.has(Flag::TimerComplete));
    }

    #[test]
    fn unknown_goto_is_journaled() {
        let flags = SharedFlags::new();
        let mut lockbox = LockBox::new(&flags, NoopHardware::new(), Config::default());
        lockbox.start(Millis::ZERO);

        assert_eq!(
            lockbox.goto(42, Millis::new(3)),
            Err(MachineError::UnrecognizedState(42))
        );
        assert_eq!(lockbox.mode(), BoxMode::UnlockedEmptyAsleep);
        assert!(matches!(
            lockbox.journal().latest().map(|record| record.kind),
            Some(RecordKind::UnrecognizedState(42))
        ));
    }
}
