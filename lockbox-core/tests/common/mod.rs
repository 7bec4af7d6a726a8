#![allow(dead_code)]

use lockbox_core::hal::{
    DialEncoder, DisplayPanel, InterruptControl, KnockDetector, LidSwitch, LockActuator,
    MotionSensor, PhoneSensor, Screen, SensorError, Vector3,
};
use lockbox_core::machine::InterruptMask;
use lockbox_core::{BoxMode, LockBox, Millis};

/// Scriptable board double. Tests flip the sensor fields and inspect the
/// actuator fields.
#[derive(Debug, Default)]
pub struct MockBoard {
    pub engaged: bool,
    pub engage_calls: u32,
    pub disengage_calls: u32,
    pub mask: Option<InterruptMask>,
    pub screen: Option<Screen>,
    pub renders: u32,
    pub phone: bool,
    pub nfc_busy: bool,
    pub detect_started: u32,
    detect_pending: bool,
    pub accel: Vector3,
    pub accel_fault: bool,
    pub dial: u16,
    pub lid_open: bool,
    pub knock: Option<bool>,
}

impl LockActuator for MockBoard {
    fn engage(&mut self) {
        self.engaged = true;
        self.engage_calls += 1;
    }

    fn disengage(&mut self) {
        self.engaged = false;
        self.disengage_calls += 1;
    }
}

impl InterruptControl for MockBoard {
    fn apply_mask(&mut self, mask: InterruptMask) {
        self.mask = Some(mask);
    }
}

impl DisplayPanel for MockBoard {
    fn render(&mut self, screen: Screen) {
        self.screen = Some(screen);
        self.renders += 1;
    }
}

impl PhoneSensor for MockBoard {
    fn begin_detect(&mut self) -> Result<(), SensorError> {
        if self.nfc_busy {
            return Err(SensorError::Busy);
        }
        self.detect_started += 1;
        self.detect_pending = true;
        Ok(())
    }

    fn detect_ready(&mut self) -> bool {
        self.detect_pending
    }

    fn read_target(&mut self) -> bool {
        self.detect_pending = false;
        self.phone
    }
}

impl MotionSensor for MockBoard {
    fn sample(&mut self) -> Option<Vector3> {
        (!self.accel_fault).then_some(self.accel)
    }
}

impl DialEncoder for MockBoard {
    fn position(&mut self) -> u16 {
        self.dial
    }
}

impl LidSwitch for MockBoard {
    fn is_open(&mut self) -> bool {
        self.lid_open
    }
}

impl KnockDetector for MockBoard {
    fn verdict(&mut self) -> Option<bool> {
        self.knock.take()
    }
}

/// Drives a [`LockBox`] one millisecond at a time.
pub struct Sim<'f> {
    pub lockbox: LockBox<'f, MockBoard>,
    pub now: Millis,
}

impl<'f> Sim<'f> {
    pub fn started(lockbox: LockBox<'f, MockBoard>, now: Millis) -> Self {
        let mut sim = Self { lockbox, now };
        sim.lockbox.start(now);
        sim
    }

    pub fn run_for(&mut self, ms: u32) {
        for _ in 0..ms {
            self.now += 1;
            self.lockbox.tick(self.now);
        }
    }

    /// Ticks until the box reaches `mode` or `limit_ms` elapse. Returns the
    /// elapsed time on success.
    pub fn run_until(&mut self, mode: BoxMode, limit_ms: u32) -> Option<u32> {
        for elapsed in 1..=limit_ms {
            self.now += 1;
            self.lockbox.tick(self.now);
            if self.lockbox.mode() == mode {
                return Some(elapsed);
            }
        }
        None
    }

    pub fn board(&mut self) -> &mut MockBoard {
        self.lockbox.hardware_mut()
    }
}
