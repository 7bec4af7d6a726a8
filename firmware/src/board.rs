//! Pin-level implementations of the lock box collaborators.

use defmt::{Display2Format, info, warn};
use embassy_stm32::gpio::{Input, Output};
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use lockbox_core::hal::{
    DialEncoder, DisplayPanel, InterruptControl, KnockDetector, LidSwitch, LockActuator,
    MotionSensor, PhoneSensor, Screen, SensorError, Vector3,
};
use lockbox_core::machine::InterruptMask;
use lockbox_core::Clock;
use portable_atomic::{AtomicU16, Ordering};

use crate::irq::InterruptGate;
use crate::knock::SharedKnock;

/// LSM303 accelerometer address (SA0 high).
const ACCEL_ADDR: u8 = 0x19;
const CTRL_REG1_A: u8 = 0x20;
/// 1.344 kHz, all axes enabled.
const CTRL_REG1_A_VALUE: u8 = 0x97;
/// OUT_X_L_A with the auto-increment bit set.
const OUT_X_L_A: u8 = 0x28 | 0x80;

/// Signals shared with the interrupt-side tasks.
pub struct Shared {
    pub clock: &'static Clock,
    pub gate: &'static InterruptGate,
    pub knock: &'static SharedKnock,
    pub encoder: &'static AtomicU16,
}

pub struct Board {
    solenoid: Output<'static>,
    lid: Input<'static>,
    phone: Input<'static>,
    i2c: I2c<'static, Blocking>,
    accel_ready: bool,
    screen: Option<Screen>,
    shared: Shared,
}

impl Board {
    pub fn new(
        solenoid: Output<'static>,
        lid: Input<'static>,
        phone: Input<'static>,
        mut i2c: I2c<'static, Blocking>,
        shared: Shared,
    ) -> Self {
        let accel_ready = match i2c.blocking_write(ACCEL_ADDR, &[CTRL_REG1_A, CTRL_REG1_A_VALUE]) {
            Ok(()) => true,
            Err(_) => {
                warn!("board: accelerometer did not acknowledge, motion disabled");
                false
            }
        };

        Self {
            solenoid,
            lid,
            phone,
            i2c,
            accel_ready,
            screen: None,
            shared,
        }
    }
}

impl LockActuator for Board {
    fn engage(&mut self) {
        self.solenoid.set_high();
    }

    fn disengage(&mut self) {
        self.solenoid.set_low();
    }
}

impl InterruptControl for Board {
    fn apply_mask(&mut self, mask: InterruptMask) {
        self.shared.gate.publish(mask);
    }
}

impl DisplayPanel for Board {
    fn render(&mut self, screen: Screen) {
        if self.screen != Some(screen) {
            info!("display: {}", Display2Format(&screen));
            self.screen = Some(screen);
        }
    }
}

impl PhoneSensor for Board {
    // The presence line is level-driven; a detect always completes at once.
    fn begin_detect(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn detect_ready(&mut self) -> bool {
        true
    }

    fn read_target(&mut self) -> bool {
        self.phone.is_low()
    }
}

impl MotionSensor for Board {
    fn sample(&mut self) -> Option<Vector3> {
        if !self.accel_ready {
            return None;
        }

        let mut raw = [0u8; 6];
        if self
            .i2c
            .blocking_write_read(ACCEL_ADDR, &[OUT_X_L_A], &mut raw)
            .is_err()
        {
            warn!("board: accelerometer read failed");
            return None;
        }

        Some(Vector3::new(
            i16::from_le_bytes([raw[0], raw[1]]),
            i16::from_le_bytes([raw[2], raw[3]]),
            i16::from_le_bytes([raw[4], raw[5]]),
        ))
    }
}

impl DialEncoder for Board {
    fn position(&mut self) -> u16 {
        self.shared.encoder.load(Ordering::Acquire)
    }
}

impl LidSwitch for Board {
    fn is_open(&mut self) -> bool {
        // Reed switch to ground, pulled up when the magnet is away.
        self.lid.is_high()
    }
}

impl KnockDetector for Board {
    fn verdict(&mut self) -> Option<bool> {
        self.shared.knock.take_verdict(self.shared.clock.now())
    }
}
