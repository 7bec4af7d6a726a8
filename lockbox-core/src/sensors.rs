//! Per-sensor bookkeeping kept between scheduled samples.
//!
//! Each tracker turns raw collaborator readings into "something happened"
//! decisions. They survive state transitions so a change made while a sensor
//! was not being polled is still noticed on the first sample afterwards.

use crate::config::{Config, NFC_READ_DELAY_MS, NFC_RESTART_MS};
use crate::hal::{PhoneSensor, Vector3};
use crate::scheduler::{EventMode, RegisterError, Scheduler};
use crate::tasks::Task;

/// Detects dial rotation from a free-running hardware counter.
#[derive(Copy, Clone, Debug, Default)]
pub struct DialTracker {
    last: Option<u16>,
}

impl DialTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Stores `position` and reports whether it moved since the last sample.
    /// The first sample only establishes a baseline.
    pub fn update(&mut self, position: u16) -> bool {
        let moved = self.last.is_some_and(|last| last != position);
        self.last = Some(position);
        moved
    }
}

/// Detects box movement from consecutive accelerometer samples.
#[derive(Copy, Clone, Debug, Default)]
pub struct MotionTracker {
    last: Option<Vector3>,
}

impl MotionTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Stores `sample` and reports whether it differs from the previous one
    /// by more than `threshold`.
    pub fn update(&mut self, sample: Vector3, threshold: u32) -> bool {
        let moved = self
            .last
            .is_some_and(|last| sample.manhattan_delta(last) > threshold);
        self.last = Some(sample);
        moved
    }
}

/// Outcome of one NFC chain step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NfcStep {
    /// The reader refused the detect command; start again later.
    RetryStart,
    /// Waiting for the reader; next poll after the given delay.
    Polling(u16),
    /// A response is waiting and will be read next.
    ReadPending,
    /// Poll budget exhausted; the scan restarts.
    GaveUp,
    /// The reader answered. `true` when a phone was found.
    Read(bool),
}

/// Back-off state for the self-rescheduling NFC poll chain.
#[derive(Copy, Clone, Debug, Default)]
pub struct NfcPoller {
    polls: u8,
    poll_delay: u16,
}

impl NfcPoller {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            polls: 0,
            poll_delay: 0,
        }
    }

    /// Number of readiness polls in the current scan.
    #[must_use]
    pub const fn polls(&self) -> u8 {
        self.polls
    }

    /// Sends a detect command and schedules the first readiness poll.
    pub fn start<S: PhoneSensor>(
        &mut self,
        sensor: &mut S,
        scheduler: &mut Scheduler<Task>,
        config: &Config,
    ) -> Result<NfcStep, RegisterError> {
        self.polls = 0;
        self.poll_delay = config.nfc_poll_min_ms;

        if sensor.begin_detect().is_err() {
            follow_up(scheduler, Task::NfcStart, NFC_RESTART_MS)?;
            return Ok(NfcStep::RetryStart);
        }

        follow_up(scheduler, Task::NfcPoll, self.poll_delay)?;
        Ok(NfcStep::Polling(self.poll_delay))
    }

    /// Checks readiness, backing off by doubling the delay up to the configured ceiling.
    pub fn poll<S: PhoneSensor>(
        &mut self,
        sensor: &mut S,
        scheduler: &mut Scheduler<Task>,
        config: &Config,
    ) -> Result<NfcStep, RegisterError> {
        self.polls = self.polls.saturating_add(1);

        if sensor.detect_ready() {
            follow_up(scheduler, Task::NfcRead, NFC_READ_DELAY_MS)?;
            return Ok(NfcStep::ReadPending);
        }

        if self.polls >= config.nfc_max_polls {
            follow_up(scheduler, Task::NfcStart, NFC_RESTART_MS)?;
            return Ok(NfcStep::GaveUp);
        }

        self.poll_delay = self
            .poll_delay
            .saturating_mul(2)
            .clamp(config.nfc_poll_min_ms, config.nfc_poll_max_ms);
        follow_up(scheduler, Task::NfcPoll, self.poll_delay)?;
        Ok(NfcStep::Polling(self.poll_delay))
    }

    /// Reads the response and queues the next scan.
    pub fn read<S: PhoneSensor>(
        &mut self,
        sensor: &mut S,
        scheduler: &mut Scheduler<Task>,
    ) -> Result<NfcStep, RegisterError> {
        let present = sensor.read_target();
        follow_up(scheduler, Task::NfcStart, NFC_RESTART_MS)?;
        Ok(NfcStep::Read(present))
    }
}

fn follow_up(scheduler: &mut Scheduler<Task>, task: Task, delay: u16) -> Result<(), RegisterError> {
    scheduler.register(task, task.label(), EventMode::Single, delay, 0)
}
