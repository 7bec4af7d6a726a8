//! Collaborator interfaces the control core drives.
//!
//! The core never touches registers. Everything device-specific (solenoid
//! GPIO, interrupt enables, NFC front-end, accelerometer, encoder counter,
//! lid switch, knock detector and the display) sits behind these small
//! traits. Firmware implements them on real peripherals; the emulator and
//! tests implement them on plain structs.

use core::fmt;

use crate::machine::InterruptMask;

/// Drives the solenoid that holds the lid shut.
pub trait LockActuator {
    fn engage(&mut self);
    fn disengage(&mut self);
}

/// Enables or masks the dial-button and audio-threshold interrupts.
pub trait InterruptControl {
    fn apply_mask(&mut self, mask: InterruptMask);
}

/// Renders a logical screen. Layout and fonts are the panel driver's business.
pub trait DisplayPanel {
    fn render(&mut self, screen: Screen);
}

/// Phone detection front-end, split into the begin / ready / read phases of
/// a non-blocking NFC target scan.
pub trait PhoneSensor {
    /// Sends the detect command. An error asks the caller to try again later.
    fn begin_detect(&mut self) -> Result<(), SensorError>;
    /// Returns `true` once the reader has a response waiting.
    fn detect_ready(&mut self) -> bool;
    /// Reads the response; `true` when a target (the phone) answered.
    fn read_target(&mut self) -> bool;
}

/// Raw accelerometer access.
pub trait MotionSensor {
    /// Latest 3-axis sample, or `None` when the bus transaction failed.
    fn sample(&mut self) -> Option<Vector3>;
}

/// Hardware quadrature counter behind the dial.
pub trait DialEncoder {
    fn position(&mut self) -> u16;
}

/// Reed switch on the lid.
pub trait LidSwitch {
    fn is_open(&mut self) -> bool;
}

/// Knock-pattern matcher fed by the audio front-end.
pub trait KnockDetector {
    /// `Some(true)` for a matching pattern, `Some(false)` for a completed
    /// non-matching one, `None` while still capturing.
    fn verdict(&mut self) -> Option<bool>;
}

/// Everything the [`LockBox`](crate::lockbox::LockBox) needs from the board.
pub trait BoxHardware:
    LockActuator
    + InterruptControl
    + DisplayPanel
    + PhoneSensor
    + MotionSensor
    + DialEncoder
    + LidSwitch
    + KnockDetector
{
}

impl<T> BoxHardware for T where
    T: LockActuator
        + InterruptControl
        + DisplayPanel
        + PhoneSensor
        + MotionSensor
        + DialEncoder
        + LidSwitch
        + KnockDetector
{
}

/// Failure reported by a sensor front-end.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorError {
    Busy,
    Bus,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Busy => f.write_str("sensor busy"),
            SensorError::Bus => f.write_str("bus transaction failed"),
        }
    }
}

/// Signed 3-axis accelerometer reading.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Vector3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Sum of absolute per-axis differences.
    #[must_use]
    pub fn manhattan_delta(self, previous: Vector3) -> u32 {
        (i32::from(self.x) - i32::from(previous.x)).unsigned_abs()
            + (i32::from(self.y) - i32::from(previous.y)).unsigned_abs()
            + (i32::from(self.z) - i32::from(previous.z)).unsigned_abs()
    }
}

/// Logical screens shown by the box.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Screen {
    Off,
    Greeting,
    InsertPhone,
    LockPrompt { lock_secs: u32 },
    Unlocked,
    Arming,
    Locked { remaining_secs: u32 },
    Listening { remaining_secs: u32 },
    Notification { unlock_selected: bool },
    ForceOpen,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Off => f.write_str("off"),
            Screen::Greeting => f.write_str("hello!"),
            Screen::InsertPhone => f.write_str("insert phone"),
            Screen::LockPrompt { lock_secs } => write!(f, "press to lock for {lock_secs}s"),
            Screen::Unlocked => f.write_str("unlocked"),
            Screen::Arming => f.write_str("close the lid to lock"),
            Screen::Locked { remaining_secs } => write!(f, "locked {remaining_secs}s"),
            Screen::Listening { remaining_secs } => {
                write!(f, "listening... locked {remaining_secs}s")
            }
            Screen::Notification { unlock_selected } => {
                if *unlock_selected {
                    f.write_str("notification: [unlock] ignore")
                } else {
                    f.write_str("notification: unlock [ignore]")
                }
            }
            Screen::ForceOpen => f.write_str("FORCED OPEN"),
        }
    }
}

/// Board stand-in that does nothing and senses nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopHardware;

impl NoopHardware {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LockActuator for NoopHardware {
    fn engage(&mut self) {}

    fn disengage(&mut self) {}
}

impl InterruptControl for NoopHardware {
    fn apply_mask(&mut self, _: InterruptMask) {}
}

impl DisplayPanel for NoopHardware {
    fn render(&mut self, _: Screen) {}
}

impl PhoneSensor for NoopHardware {
    fn begin_detect(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Busy)
    }

    fn detect_ready(&mut self) -> bool {
        false
    }

    fn read_target(&mut self) -> bool {
        false
    }
}

impl MotionSensor for NoopHardware {
    fn sample(&mut self) -> Option<Vector3> {
        None
    }
}

impl DialEncoder for NoopHardware {
    fn position(&mut self) -> u16 {
        0
    }
}

impl LidSwitch for NoopHardware {
    fn is_open(&mut self) -> bool {
        false
    }
}

impl KnockDetector for NoopHardware {
    fn verdict(&mut self) -> Option<bool> {
        None
    }
}
