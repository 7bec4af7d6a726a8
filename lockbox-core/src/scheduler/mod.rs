//! Fixed-capacity cooperative event scheduler.
//!
//! The [`Scheduler`] owns a table of [`Event`] slots. Each slot names a
//! callback, the subsystem that registered it ([`EventLabel`]), a repetition
//! [`EventMode`] and the absolute clock value at which it is next due. The
//! main loop calls [`Scheduler::tick`] with the current time; every due slot
//! has its callback handed to a dispatcher and is then rescheduled or freed
//! according to its mode.
//!
//! The scheduler is generic over the callback type so firmware, emulator and
//! tests can all dispatch through a closed enum of operations instead of
//! function pointers.

use core::fmt;

use crate::time::Millis;

pub mod context;

pub use context::EventContext;

/// Number of slots in the event table.
pub const MAX_EVENT_COUNT: usize = 10;

/// Modulus of the registration jitter term (`now % 7`).
pub const SCHEDULE_JITTER_MODULUS: u32 = 7;

/// Subsystem that owns a scheduled event. [`EventLabel::Empty`] marks a free slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventLabel {
    Empty,
    StateMachine,
    Timer,
    NfcStart,
    NfcPoll,
    NfcRead,
    Dial,
    Motion,
    Audio,
    Lid,
    Countdown,
    Display,
}

impl EventLabel {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EventLabel::Empty => "empty",
            EventLabel::StateMachine => "state-machine",
            EventLabel::Timer => "timer",
            EventLabel::NfcStart => "nfc-start",
            EventLabel::NfcPoll => "nfc-poll",
            EventLabel::NfcRead => "nfc-read",
            EventLabel::Dial => "dial",
            EventLabel::Motion => "motion",
            EventLabel::Audio => "audio",
            EventLabel::Lid => "lid",
            EventLabel::Countdown => "countdown",
            EventLabel::Display => "display",
        }
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Repetition semantics for a scheduled event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventMode {
    /// Mode of a free slot. Never fires; registering with it is rejected.
    Disabled,
    /// Fires once, `delay` ms (plus jitter) after registration.
    Single,
    /// Fires once, exactly `delay` ms after registration.
    SingleImmediate,
    /// Fires every `delay` ms, first firing after the jitter offset.
    Delta,
    /// Fires on the next tick, then every `delay` ms.
    DeltaImmediate,
    /// Fires every `delay` ms while the packed repeat count lasts, then once more as [`EventMode::Single`].
    NRepeat,
    /// Like [`EventMode::NRepeat`] but the first firing happens on the next tick.
    NRepeatImmediate,
}

impl EventMode {
    /// Returns `true` for modes whose context packs a repeat count.
    #[must_use]
    pub const fn is_repeat(self) -> bool {
        matches!(self, EventMode::NRepeat | EventMode::NRepeatImmediate)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EventMode::Disabled => "disabled",
            EventMode::Single => "single",
            EventMode::SingleImmediate => "single-immediate",
            EventMode::Delta => "delta",
            EventMode::DeltaImmediate => "delta-immediate",
            EventMode::NRepeat => "n-repeat",
            EventMode::NRepeatImmediate => "n-repeat-immediate",
        }
    }
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reasons a registration is refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterError {
    /// Every slot is occupied.
    QueueFull,
    /// The slot was claimed but its mode cannot be scheduled; it stays inert.
    InvalidMode,
    /// [`EventLabel::Empty`] is reserved for free slots.
    ReservedLabel,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::QueueFull => f.write_str("event table full"),
            RegisterError::InvalidMode => f.write_str("event mode cannot be scheduled"),
            RegisterError::ReservedLabel => f.write_str("label reserved for free slots"),
        }
    }
}

/// Errors raised while computing a slot's schedule time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleError {
    InvalidMode(EventMode),
    NoSuchSlot(usize),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidMode(mode) => write!(f, "cannot schedule {mode} event"),
            ScheduleError::NoSuchSlot(index) => write!(f, "slot {index} out of range"),
        }
    }
}

impl From<ScheduleError> for RegisterError {
    fn from(_: ScheduleError) -> Self {
        RegisterError::InvalidMode
    }
}

/// One slot of the event table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Event<C> {
    callback: Option<C>,
    label: EventLabel,
    mode: EventMode,
    schedule_time: Millis,
    context: EventContext,
}

impl<C: Copy> Event<C> {
    /// A free slot: empty label, never due.
    #[must_use]
    pub const fn vacant() -> Self {
        Self {
            callback: None,
            label: EventLabel::Empty,
            mode: EventMode::Disabled,
            schedule_time: Millis::MAX,
            context: EventContext::ZERO,
        }
    }

    #[must_use]
    pub const fn callback(&self) -> Option<C> {
        self.callback
    }

    #[must_use]
    pub const fn label(&self) -> EventLabel {
        self.label
    }

    #[must_use]
    pub const fn mode(&self) -> EventMode {
        self.mode
    }

    #[must_use]
    pub const fn schedule_time(&self) -> Millis {
        self.schedule_time
    }

    #[must_use]
    pub const fn context(&self) -> EventContext {
        self.context
    }

    #[must_use]
    pub const fn is_vacant(&self) -> bool {
        matches!(self.label, EventLabel::Empty)
    }

    /// Delay between firings, decoded according to the mode.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn delay(&self) -> u16 {
        if self.mode.is_repeat() {
            self.context.repeat_delay() as u16
        } else {
            self.context.raw()
        }
    }

    /// Remaining repeat count for `NRepeat*` events.
    #[must_use]
    pub const fn repeats(&self) -> Option<u8> {
        if self.mode.is_repeat() {
            Some(self.context.repeats())
        } else {
            None
        }
    }

    fn is_due(&self, now: Millis) -> bool {
        !self.is_vacant()
            && !matches!(self.mode, EventMode::Disabled)
            && now.has_reached(self.schedule_time)
    }
}

/// Event table plus the scheduling rules that advance it.
pub struct Scheduler<C, const N: usize = MAX_EVENT_COUNT> {
    slots: [Event<C>; N],
    now: Millis,
    epoch: u32,
}

impl<C: Copy, const N: usize> Scheduler<C, N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { Event::vacant() }; N],
            now: Millis::ZERO,
            epoch: 0,
        }
    }

    /// Clock value used for registrations made outside of [`Scheduler::tick`].
    pub fn set_now(&mut self, now: Millis) {
        self.now = now;
    }

    #[must_use]
    pub const fn now(&self) -> Millis {
        self.now
    }

    /// Claims the first free slot for `callback` and schedules it.
    ///
    /// For `NRepeat*` modes the delay is clamped to 255 ms and packed with
    /// `repeat_n`; other modes ignore `repeat_n`. When the mode cannot be
    /// scheduled the slot stays claimed but never fires.
    pub fn register(
        &mut self,
        callback: C,
        label: EventLabel,
        mode: EventMode,
        delta: u16,
        repeat_n: u8,
    ) -> Result<(), RegisterError> {
        if matches!(label, EventLabel::Empty) {
            return Err(RegisterError::ReservedLabel);
        }

        let index = self
            .slots
            .iter()
            .position(Event::is_vacant)
            .ok_or(RegisterError::QueueFull)?;

        let context = if mode.is_repeat() {
            EventContext::repeating(repeat_n, delta)
        } else {
            EventContext::delay(delta)
        };

        self.slots[index] = Event {
            callback: Some(callback),
            label,
            mode,
            schedule_time: Millis::MAX,
            context,
        };

        self.schedule(index)?;
        Ok(())
    }

    /// Computes the first due time for the slot at `index` from the current clock.
    pub fn schedule(&mut self, index: usize) -> Result<Millis, ScheduleError> {
        let now = self.now;
        let jitter = now.as_u32() % SCHEDULE_JITTER_MODULUS;
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ScheduleError::NoSuchSlot(index))?;
        let delay = u32::from(slot.delay());

        let due = match slot.mode {
            EventMode::Single => now + jitter + delay,
            EventMode::SingleImmediate => now + delay,
            EventMode::Delta | EventMode::NRepeat => now + jitter,
            EventMode::DeltaImmediate | EventMode::NRepeatImmediate => now,
            EventMode::Disabled => return Err(ScheduleError::InvalidMode(slot.mode)),
        };

        slot.schedule_time = due;
        Ok(due)
    }

    /// Fires every due slot and reschedules or frees it.
    ///
    /// `dispatch` receives the scheduler itself so callbacks can register
    /// follow-up events. If a callback clears the table, the pass stops: the
    /// slot it came from now belongs to someone else and the remaining slots
    /// were all wiped. Returns the number of callbacks invoked.
    pub fn tick<F>(&mut self, now: Millis, mut dispatch: F) -> usize
    where
        F: FnMut(&mut Self, C),
    {
        self.now = now;
        let mut fired = 0;

        for index in 0..N {
            let event = self.slots[index];
            if !event.is_due(now) {
                continue;
            }
            let Some(callback) = event.callback else {
                continue;
            };

            let epoch = self.epoch;
            dispatch(self, callback);
            fired += 1;

            if self.epoch != epoch {
                break;
            }
            self.reschedule(index, now);
        }

        fired
    }

    fn reschedule(&mut self, index: usize, now: Millis) {
        let slot = &mut self.slots[index];
        match slot.mode {
            EventMode::Single | EventMode::SingleImmediate | EventMode::Disabled => {
                *slot = Event::vacant();
            }
            EventMode::Delta => {
                slot.schedule_time = now + u32::from(slot.context.raw());
            }
            EventMode::DeltaImmediate => {
                slot.mode = EventMode::Delta;
                slot.schedule_time = now + u32::from(slot.context.raw());
            }
            EventMode::NRepeat | EventMode::NRepeatImmediate => {
                slot.mode = EventMode::NRepeat;
                let remaining = slot.context.repeats();
                if remaining > 1 {
                    slot.context = slot.context.with_repeats(remaining - 1);
                } else {
                    slot.mode = EventMode::Single;
                    slot.context = slot.context.strip_repeats();
                }
                slot.schedule_time = now + u32::from(slot.context.repeat_delay());
            }
        }
    }

    /// Frees every slot.
    pub fn clear(&mut self) {
        self.slots = [const { Event::vacant() }; N];
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_vacant()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Event::is_vacant)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[must_use]
    pub fn is_scheduled(&self, label: EventLabel) -> bool {
        self.find(label).is_some()
    }

    /// First occupied slot carrying `label`.
    #[must_use]
    pub fn find(&self, label: EventLabel) -> Option<&Event<C>> {
        self.iter().find(|slot| slot.label == label)
    }

    /// Occupied slots in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Event<C>> + '_ {
        self.slots.iter().filter(|slot| !slot.is_vacant())
    }

    /// Raw view of every slot, free ones included.
    #[must_use]
    pub fn slots(&self) -> &[Event<C>] {
        &self.slots
    }
}

impl<C: Copy, const N: usize> Default for Scheduler<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum Probe {
        A,
        B,
        Rearm,
        Wipe,
    }

    fn jitter(now: Millis) -> u32 {
        now.as_u32() % SCHEDULE_JITTER_MODULUS
    }

    #[test]
    fn free_slots_use_sentinels() {
        let scheduler = Scheduler::<Probe>::new();
        assert!(scheduler.is_empty());
        for slot in scheduler.slots() {
            assert_eq!(slot.label(), EventLabel::Empty);
            assert_eq!(slot.schedule_time(), Millis::MAX);
            assert_eq!(slot.callback(), None);
        }
    }

    #[test]
    fn register_rejects_when_table_full() {
        let mut scheduler = Scheduler::<Probe, 2>::new();
        scheduler
            .register(Probe::A, EventLabel::Timer, EventMode::Single, 10, 0)
            .expect("first slot");
        scheduler
            .register(Probe::B, EventLabel::Dial, EventMode::Delta, 10, 0)
            .expect("second slot");

        assert_eq!(
            scheduler.register(Probe::A, EventLabel::Lid, EventMode::Single, 10, 0),
            Err(RegisterError::QueueFull)
        );
        assert_eq!(scheduler.len(), 2);
        assert!(!scheduler.is_scheduled(EventLabel::Lid));
    }

    #[test]
    fn register_rejects_reserved_label() {
        let mut scheduler = Scheduler::<Probe>::new();
        assert_eq!(
            scheduler.register(Probe::A, EventLabel::Empty, EventMode::Single, 1, 0),
            Err(RegisterError::ReservedLabel)
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn disabled_mode_claims_an_inert_slot() {
        let mut scheduler = Scheduler::<Probe>::new();
        assert_eq!(
            scheduler.register(Probe::A, EventLabel::Audio, EventMode::Disabled, 0, 0),
            Err(RegisterError::InvalidMode)
        );
        assert!(scheduler.is_scheduled(EventLabel::Audio));

        let mut fired = 0;
        for now in 0..100 {
            fired += scheduler.tick(Millis::new(now), |_, _| {});
        }
        assert_eq!(fired, 0);
        assert_eq!(
            scheduler.schedule(MAX_EVENT_COUNT),
            Err(ScheduleError::NoSuchSlot(MAX_EVENT_COUNT))
        );
    }

    #[test]
    fn schedule_offsets_follow_mode() {
        let now = Millis::new(1_003);
        let offset = jitter(now);
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler.set_now(now);

        let cases = [
            (EventLabel::Timer, EventMode::Single, now + offset + 40),
            (EventLabel::Display, EventMode::SingleImmediate, now + 40),
            (EventLabel::Dial, EventMode::Delta, now + offset),
            (EventLabel::Lid, EventMode::DeltaImmediate, now),
            (EventLabel::Audio, EventMode::NRepeat, now + offset),
            (EventLabel::Motion, EventMode::NRepeatImmediate, now),
        ];

        for (label, mode, expected) in cases {
            scheduler
                .register(Probe::A, label, mode, 40, 2)
                .expect("registration");
            let slot = scheduler.find(label).expect("registered slot");
            assert_eq!(slot.schedule_time(), expected, "{mode}");
        }
    }

    #[test]
    fn single_fires_once_and_frees_slot() {
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler
            .register(Probe::A, EventLabel::Timer, EventMode::Single, 20, 0)
            .expect("registration");
        let due = scheduler.find(EventLabel::Timer).unwrap().schedule_time();

        let mut calls = 0;
        for now in 0..200 {
            scheduler.tick(Millis::new(now), |_, _| calls += 1);
            if Millis::new(now) == due {
                assert!(scheduler.is_empty());
            }
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn delta_immediate_fires_now_then_degrades() {
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler.set_now(Millis::new(5));
        scheduler
            .register(Probe::A, EventLabel::Display, EventMode::DeltaImmediate, 10, 0)
            .expect("registration");

        let mut stamps = heapless::Vec::<u32, 8>::new();
        for now in 5..40 {
            scheduler.tick(Millis::new(now), |_, _| {
                stamps.push(now).unwrap();
            });
        }

        assert_eq!(stamps.as_slice(), &[5, 15, 25, 35]);
        let slot = scheduler.find(EventLabel::Display).unwrap();
        assert_eq!(slot.mode(), EventMode::Delta);
        assert_eq!(slot.schedule_time(), Millis::new(45));
    }

    #[test]
    fn n_repeat_fires_then_degrades_to_single() {
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler
            .register(Probe::A, EventLabel::Audio, EventMode::NRepeat, 10, 3)
            .expect("registration");

        let mut calls = 0;
        for now in 0..30 {
            scheduler.tick(Millis::new(now), |_, _| calls += 1);
        }
        assert_eq!(calls, 3);
        let slot = scheduler.find(EventLabel::Audio).expect("slot kept");
        assert_eq!(slot.mode(), EventMode::Single);
        assert_eq!(slot.repeats(), None);
        assert_eq!(slot.delay(), 10);

        for now in 30..200 {
            scheduler.tick(Millis::new(now), |_, _| calls += 1);
        }
        assert_eq!(calls, 4);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn n_repeat_immediate_counts_down_packed_context() {
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler
            .register(Probe::A, EventLabel::Display, EventMode::NRepeatImmediate, 300, 4)
            .expect("registration");
        assert_eq!(scheduler.find(EventLabel::Display).unwrap().delay(), 255);

        scheduler.tick(Millis::ZERO, |_, _| {});
        let slot = scheduler.find(EventLabel::Display).unwrap();
        assert_eq!(slot.mode(), EventMode::NRepeat);
        assert_eq!(slot.repeats(), Some(3));
        assert_eq!(slot.schedule_time(), Millis::new(255));
    }

    #[test]
    fn single_fires_exactly_once_across_wraparound() {
        let start = Millis::new(u32::MAX - 5);
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler.set_now(start);
        scheduler
            .register(Probe::A, EventLabel::Timer, EventMode::Single, 10, 0)
            .expect("registration");

        let expected = start + jitter(start) + 10;
        assert!(expected.as_u32() < 20, "deadline should land after the wrap");

        let mut fired_at = heapless::Vec::<Millis, 4>::new();
        let mut now = start;
        for _ in 0..64 {
            scheduler.tick(now, |_, _| fired_at.push(now).unwrap());
            now += 1;
        }

        assert_eq!(fired_at.as_slice(), &[expected]);
    }

    #[test]
    fn callbacks_can_register_follow_up_events() {
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler
            .register(Probe::Rearm, EventLabel::NfcStart, EventMode::SingleImmediate, 0, 0)
            .expect("registration");

        scheduler.tick(Millis::ZERO, |scheduler, probe| {
            if probe == Probe::Rearm {
                scheduler
                    .register(Probe::B, EventLabel::NfcPoll, EventMode::SingleImmediate, 10, 0)
                    .expect("follow-up");
            }
        });

        assert!(!scheduler.is_scheduled(EventLabel::NfcStart));
        let poll = scheduler.find(EventLabel::NfcPoll).expect("poll queued");
        assert_eq!(poll.schedule_time(), Millis::new(10));
    }

    #[test]
    fn clearing_inside_a_callback_ends_the_pass() {
        let mut scheduler = Scheduler::<Probe>::new();
        scheduler
            .register(Probe::Wipe, EventLabel::StateMachine, EventMode::DeltaImmediate, 50, 0)
            .expect("registration");
        scheduler
            .register(Probe::B, EventLabel::Dial, EventMode::DeltaImmediate, 50, 0)
            .expect("registration");

        let mut seen = heapless::Vec::<Probe, 4>::new();
        scheduler.tick(Millis::ZERO, |scheduler, probe| {
            seen.push(probe).unwrap();
            if probe == Probe::Wipe {
                scheduler.clear();
                scheduler
                    .register(Probe::A, EventLabel::Timer, EventMode::Single, 100, 0)
                    .expect("fresh registration");
            }
        });

        assert_eq!(seen.as_slice(), &[Probe::Wipe]);
        assert_eq!(scheduler.len(), 1);
        let timer = scheduler.find(EventLabel::Timer).expect("fresh event intact");
        assert_eq!(timer.mode(), EventMode::Single);
        assert_eq!(timer.schedule_time(), Millis::new(100));
    }

    #[test]
    fn clear_frees_every_slot() {
        let mut scheduler = Scheduler::<Probe>::new();
        for label in [EventLabel::Timer, EventLabel::Dial, EventLabel::Lid] {
            scheduler
                .register(Probe::A, label, EventMode::Delta, 5, 0)
                .expect("registration");
        }
        scheduler.clear();

        assert!(scheduler.is_empty());
        assert!(
            scheduler
                .slots()
                .iter()
                .all(|slot| slot.schedule_time() == Millis::MAX)
        );
    }
}
