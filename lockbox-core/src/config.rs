//! Tunables for the control core.
//!
//! [`Config`] carries the values a board may want to change at start-up.
//! Cadences and per-state timeouts are compile-time constants consumed by
//! the per-state event table in [`crate::machine::events`].

/// State-machine evaluation period while awake.
pub const STATE_EVAL_AWAKE_MS: u16 = 50;
/// State-machine evaluation period while asleep.
pub const STATE_EVAL_ASLEEP_MS: u16 = 100;

pub const DISPLAY_REFRESH_MS: u16 = 250;
pub const DIAL_POLL_MS: u16 = 100;
pub const MOTION_POLL_MS: u16 = 200;
pub const LID_POLL_MS: u16 = 100;
pub const AUDIO_POLL_MS: u16 = 50;
pub const COUNTDOWN_POLL_MS: u16 = 1_000;

pub const GREETING_MS: u16 = 1_000;
pub const GREETING_FRAME_MS: u16 = 250;
pub const GREETING_FRAMES: u8 = 4;

pub const IDLE_TIMEOUT_MS: u16 = 30_000;
pub const ARMING_GRACE_MS: u16 = 5_000;
pub const LOCKED_DISPLAY_TIMEOUT_MS: u16 = 15_000;
pub const KNOCK_CAPTURE_MS: u16 = 3_000;
pub const NOTIFICATION_TIMEOUT_MS: u16 = 60_000;

pub const EMERGENCY_HOLD_MS: u16 = 5_000;
pub const ALARM_FLASH_MS: u16 = 250;
pub const ALARM_FLASHES: u8 = 10;

/// Retry delay after the NFC reader refused a detect command, and the pause
/// before starting the next scan after a read.
pub const NFC_RESTART_MS: u16 = 25;
/// Delay between a ready NFC response and reading it.
pub const NFC_READ_DELAY_MS: u16 = 25;

pub const DEFAULT_LOCK_DURATION_MS: u32 = 10_000;
/// Countdown deadlines must stay inside the signed comparison window of [`Millis`](crate::time::Millis).
pub const MAX_LOCK_DURATION_MS: u32 = u32::MAX / 4;
pub const DEFAULT_MOTION_THRESHOLD: u32 = 200;
pub const DEFAULT_NFC_POLL_MIN_MS: u16 = 10;
pub const DEFAULT_NFC_POLL_MAX_MS: u16 = 160;
pub const DEFAULT_NFC_MAX_POLLS: u8 = 8;

/// Run-time configuration handed to [`LockBox::new`](crate::lockbox::LockBox::new).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// How long the solenoid stays engaged once the box locks.
    pub lock_duration_ms: u32,
    /// Summed absolute axis delta above which a sample counts as movement.
    pub motion_threshold: u32,
    /// First NFC readiness poll delay after a detect command.
    pub nfc_poll_min_ms: u16,
    /// Ceiling for the doubling poll back-off.
    pub nfc_poll_max_ms: u16,
    /// Readiness polls before the scan is restarted from scratch.
    pub nfc_max_polls: u8,
}

impl Config {
    pub const DEFAULT: Self = Self {
        lock_duration_ms: DEFAULT_LOCK_DURATION_MS,
        motion_threshold: DEFAULT_MOTION_THRESHOLD,
        nfc_poll_min_ms: DEFAULT_NFC_POLL_MIN_MS,
        nfc_poll_max_ms: DEFAULT_NFC_POLL_MAX_MS,
        nfc_max_polls: DEFAULT_NFC_MAX_POLLS,
    };

    /// Sets the lock duration, clamped to [`MAX_LOCK_DURATION_MS`].
    #[must_use]
    pub const fn with_lock_duration(mut self, ms: u32) -> Self {
        self.lock_duration_ms = if ms > MAX_LOCK_DURATION_MS {
            MAX_LOCK_DURATION_MS
        } else {
            ms
        };
        self
    }

    #[must_use]
    pub const fn with_motion_threshold(mut self, threshold: u32) -> Self {
        self.motion_threshold = threshold;
        self
    }

    /// Sets the NFC back-off bounds. `max` is raised to `min` when smaller.
    #[must_use]
    pub const fn with_nfc_poll(mut self, min_ms: u16, max_ms: u16, max_polls: u8) -> Self {
        self.nfc_poll_min_ms = min_ms;
        self.nfc_poll_max_ms = if max_ms < min_ms { min_ms } else { max_ms };
        self.nfc_max_polls = max_polls;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_duration_is_clamped() {
        let config = Config::default().with_lock_duration(u32::MAX);
        assert_eq!(config.lock_duration_ms, MAX_LOCK_DURATION_MS);

        let config = Config::default().with_lock_duration(60_000);
        assert_eq!(config.lock_duration_ms, 60_000);
    }

    #[test]
    fn nfc_back_off_ceiling_never_below_floor() {
        let config = Config::default().with_nfc_poll(40, 20, 3);
        assert_eq!(config.nfc_poll_min_ms, 40);
        assert_eq!(config.nfc_poll_max_ms, 40);
        assert_eq!(config.nfc_max_polls, 3);
    }
}
