//! Flag-driven state machine for the lock box.
//!
//! [`StateMachine::run`] reads the pending flags, picks the next mode from
//! the ordered rule table in [`rules`] and, when the mode changes, performs
//! the transition in a fixed order:
//!
//! 1. wipe the scheduler and the flag set,
//! 2. apply the `(from, to)` side effect (countdown and solenoid),
//! 3. apply the new interrupt mask,
//! 4. register the new mode's event set from [`events`],
//! 5. commit the new mode.
//!
//! Masking happens before registration so a stimulus cannot race the new
//! event set.

use core::fmt;

use heapless::Vec;

use crate::config::Config;
use crate::flags::SharedFlags;
use crate::hal::{InterruptControl, LockActuator};
use crate::scheduler::{EventLabel, RegisterError, Scheduler};
use crate::tasks::Task;
use crate::time::Millis;

pub mod events;
pub mod rules;

use events::MAX_EVENT_SET;

/// The fourteen modes of the box.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum BoxMode {
    UnlockedEmptyAsleep = 0,
    UnlockedAsleepToAwake = 1,
    UnlockedEmptyAwake = 2,
    /// Phone inside, "lock" option selected. A press here starts arming.
    ///
    /// Earlier firmware swapped the two labels and armed from a press in B.
    /// Here every unlock path lands in B, so the lock is chosen from A.
    UnlockedFullAwakeFuncA = 3,
    /// Phone inside, "stay unlocked" option selected. Every unlock lands here.
    UnlockedFullAwakeFuncB = 4,
    UnlockedFullAsleep = 5,
    /// Waiting for the lid to close before locking.
    UnlockedToLockedAwake = 6,
    LockedFullAwake = 7,
    LockedFullAsleep = 8,
    /// Capturing a knock pattern.
    LockedMonitorAwake = 9,
    LockedMonitorAsleep = 10,
    /// Notification shown, "unlock" option selected.
    LockedFullNotificationFuncA = 11,
    /// Notification shown, "dismiss" option selected.
    LockedFullNotificationFuncB = 12,
    EmergencyOpen = 13,
}

impl BoxMode {
    /// Every mode in index order.
    pub const ALL: [BoxMode; 14] = [
        BoxMode::UnlockedEmptyAsleep,
        BoxMode::UnlockedAsleepToAwake,
        BoxMode::UnlockedEmptyAwake,
        BoxMode::UnlockedFullAwakeFuncA,
        BoxMode::UnlockedFullAwakeFuncB,
        BoxMode::UnlockedFullAsleep,
        BoxMode::UnlockedToLockedAwake,
        BoxMode::LockedFullAwake,
        BoxMode::LockedFullAsleep,
        BoxMode::LockedMonitorAwake,
        BoxMode::LockedMonitorAsleep,
        BoxMode::LockedFullNotificationFuncA,
        BoxMode::LockedFullNotificationFuncB,
        BoxMode::EmergencyOpen,
    ];

    /// Mode the box powers up in.
    pub const INITIAL: BoxMode = BoxMode::UnlockedEmptyAsleep;

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BoxMode::UnlockedEmptyAsleep => "unlocked-empty-asleep",
            BoxMode::UnlockedAsleepToAwake => "unlocked-asleep-to-awake",
            BoxMode::UnlockedEmptyAwake => "unlocked-empty-awake",
            BoxMode::UnlockedFullAwakeFuncA => "unlocked-full-awake-a",
            BoxMode::UnlockedFullAwakeFuncB => "unlocked-full-awake-b",
            BoxMode::UnlockedFullAsleep => "unlocked-full-asleep",
            BoxMode::UnlockedToLockedAwake => "unlocked-to-locked-awake",
            BoxMode::LockedFullAwake => "locked-full-awake",
            BoxMode::LockedFullAsleep => "locked-full-asleep",
            BoxMode::LockedMonitorAwake => "locked-monitor-awake",
            BoxMode::LockedMonitorAsleep => "locked-monitor-asleep",
            BoxMode::LockedFullNotificationFuncA => "locked-notification-a",
            BoxMode::LockedFullNotificationFuncB => "locked-notification-b",
            BoxMode::EmergencyOpen => "emergency-open",
        }
    }

    /// Modes in which the solenoid is engaged.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(
            self,
            BoxMode::LockedFullAwake
                | BoxMode::LockedFullAsleep
                | BoxMode::LockedMonitorAwake
                | BoxMode::LockedMonitorAsleep
                | BoxMode::LockedFullNotificationFuncA
                | BoxMode::LockedFullNotificationFuncB
        )
    }

    /// Modes with the display off and slow evaluation.
    #[must_use]
    pub const fn is_asleep(self) -> bool {
        matches!(
            self,
            BoxMode::UnlockedEmptyAsleep
                | BoxMode::UnlockedFullAsleep
                | BoxMode::LockedFullAsleep
                | BoxMode::LockedMonitorAsleep
        )
    }

    /// Interrupt enables for this mode.
    #[must_use]
    pub const fn interrupt_mask(self) -> InterruptMask {
        match self {
            BoxMode::UnlockedAsleepToAwake | BoxMode::EmergencyOpen => InterruptMask::NONE,
            BoxMode::LockedFullAwake | BoxMode::LockedMonitorAwake => InterruptMask::AUDIO_ONLY,
            BoxMode::LockedFullAsleep | BoxMode::LockedMonitorAsleep => InterruptMask::ALL,
            BoxMode::UnlockedEmptyAsleep
            | BoxMode::UnlockedEmptyAwake
            | BoxMode::UnlockedFullAwakeFuncA
            | BoxMode::UnlockedFullAwakeFuncB
            | BoxMode::UnlockedFullAsleep
            | BoxMode::UnlockedToLockedAwake
            | BoxMode::LockedFullNotificationFuncA
            | BoxMode::LockedFullNotificationFuncB => InterruptMask::BUTTON_ONLY,
        }
    }
}

impl fmt::Display for BoxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for BoxMode {
    type Error = MachineError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        BoxMode::ALL
            .get(usize::from(raw))
            .copied()
            .ok_or(MachineError::UnrecognizedState(raw))
    }
}

/// Which interrupt sources may deposit flags.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InterruptMask {
    pub button: bool,
    pub audio: bool,
}

impl InterruptMask {
    pub const NONE: Self = Self {
        button: false,
        audio: false,
    };
    pub const BUTTON_ONLY: Self = Self {
        button: true,
        audio: false,
    };
    pub const AUDIO_ONLY: Self = Self {
        button: false,
        audio: true,
    };
    pub const ALL: Self = Self {
        button: true,
        audio: true,
    };
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MachineError {
    /// A raw state value outside the fourteen known modes.
    UnrecognizedState(u8),
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::UnrecognizedState(raw) => write!(f, "unrecognized state {raw}"),
        }
    }
}

/// Actuation tied to a specific `(from, to)` pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SideEffect {
    /// Start the lock countdown and engage the solenoid.
    Lock,
    /// Cancel the countdown and release the solenoid.
    Release,
}

/// Side effect of moving from `from` to `to`, if any.
#[must_use]
pub const fn side_effect(from: BoxMode, to: BoxMode) -> Option<SideEffect> {
    match (from, to) {
        (BoxMode::UnlockedToLockedAwake, BoxMode::LockedFullAwake) => Some(SideEffect::Lock),
        (_, BoxMode::EmergencyOpen) => Some(SideEffect::Release),
        (from, BoxMode::UnlockedFullAwakeFuncB) if from.is_locked() => Some(SideEffect::Release),
        _ => None,
    }
}

/// Mode plus the auxiliary fields collaborators read.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoxState {
    pub mode: BoxMode,
    pub mask: InterruptMask,
    /// Deadline of the running lock countdown.
    pub countdown: Option<Millis>,
}

impl BoxState {
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            mode: BoxMode::INITIAL,
            mask: BoxMode::INITIAL.interrupt_mask(),
            countdown: None,
        }
    }

    /// Milliseconds left on the lock countdown, or `None` when none is armed.
    #[must_use]
    pub fn countdown_remaining(&self, now: Millis) -> Option<u32> {
        self.countdown.map(|deadline| deadline.since(now))
    }

    #[must_use]
    pub fn countdown_expired(&self, now: Millis) -> bool {
        self.countdown.is_some_and(|deadline| now.has_reached(deadline))
    }
}

impl Default for BoxState {
    fn default() -> Self {
        Self::initial()
    }
}

/// A registration from the entered mode's event set that did not fit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    pub label: EventLabel,
    pub error: RegisterError,
}

/// What a completed transition did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: BoxMode,
    pub to: BoxMode,
    pub at: Millis,
    pub effect: Option<SideEffect>,
    pub rejected: Vec<Rejection, MAX_EVENT_SET>,
}

/// Owner of the [`BoxState`]. The state only changes inside this type.
#[derive(Clone, Debug, Default)]
pub struct StateMachine {
    state: BoxState,
}

impl StateMachine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: BoxState::initial(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &BoxState {
        &self.state
    }

    #[must_use]
    pub const fn mode(&self) -> BoxMode {
        self.state.mode
    }

    /// Evaluates the pending flags and transitions when a rule matches.
    /// Returns `None` when the mode stays the same; nothing is touched then.
    pub fn run<H, const F: usize>(
        &mut self,
        now: Millis,
        flags: &SharedFlags<F>,
        scheduler: &mut Scheduler<Task>,
        config: &Config,
        hardware: &mut H,
    ) -> Option<Transition>
    where
        H: LockActuator + InterruptControl,
    {
        let pending = flags.snapshot();
        let next = rules::next_mode(self.state.mode, &pending);
        if next == self.state.mode {
            return None;
        }
        Some(self.transition(next, now, flags, scheduler, config, hardware))
    }

    /// Forces a transition to the raw mode index through the normal path.
    pub fn goto<H, const F: usize>(
        &mut self,
        raw: u8,
        now: Millis,
        flags: &SharedFlags<F>,
        scheduler: &mut Scheduler<Task>,
        config: &Config,
        hardware: &mut H,
    ) -> Result<Transition, MachineError>
    where
        H: LockActuator + InterruptControl,
    {
        let next = BoxMode::try_from(raw)?;
        Ok(self.transition(next, now, flags, scheduler, config, hardware))
    }

    /// Power-up: wipes everything, releases the solenoid and enters the initial mode.
    pub fn reset<H, const F: usize>(
        &mut self,
        now: Millis,
        flags: &SharedFlags<F>,
        scheduler: &mut Scheduler<Task>,
        hardware: &mut H,
    ) -> Vec<Rejection, MAX_EVENT_SET>
    where
        H: LockActuator + InterruptControl,
    {
        scheduler.clear();
        flags.clear();
        self.state.countdown = None;
        hardware.disengage();
        self.enter(BoxMode::INITIAL, now, scheduler, hardware)
    }

    fn transition<H, const F: usize>(
        &mut self,
        next: BoxMode,
        now: Millis,
        flags: &SharedFlags<F>,
        scheduler: &mut Scheduler<Task>,
        config: &Config,
        hardware: &mut H,
    ) -> Transition
    where
        H: LockActuator + InterruptControl,
    {
        let from = self.state.mode;

        scheduler.clear();
        flags.clear();

        let effect = side_effect(from, next);
        match effect {
            Some(SideEffect::Lock) => {
                self.state.countdown = Some(now + config.lock_duration_ms);
                hardware.engage();
            }
            Some(SideEffect::Release) => {
                self.state.countdown = None;
                hardware.disengage();
            }
            None => {}
        }

        let rejected = self.enter(next, now, scheduler, hardware);
        Transition {
            from,
            to: next,
            at: now,
            effect,
            rejected,
        }
    }

    fn enter<H>(
        &mut self,
        mode: BoxMode,
        now: Millis,
        scheduler: &mut Scheduler<Task>,
        hardware: &mut H,
    ) -> Vec<Rejection, MAX_EVENT_SET>
    where
        H: InterruptControl,
    {
        let mask = mode.interrupt_mask();
        hardware.apply_mask(mask);
        self.state.mask = mask;

        scheduler.set_now(now);
        // At most one rejection per registration, and no set is longer than
        // MAX_EVENT_SET.
        let rejected = events::event_set(mode)
            .iter()
            .filter_map(|registration| {
                scheduler
                    .register(
                        registration.task,
                        registration.label(),
                        registration.mode,
                        registration.delta,
                        registration.repeats,
                    )
                    .err()
                    .map(|error| Rejection {
                        label: registration.label(),
                        error,
                    })
            })
            .collect();

        self.state.mode = mode;
        rejected
    }
}
