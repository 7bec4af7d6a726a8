use lockbox_core::hal::{
    DialEncoder, DisplayPanel, InterruptControl, KnockDetector, LidSwitch, LockActuator,
    MotionSensor, PhoneSensor, Screen, SensorError, Vector3,
};
use lockbox_core::machine::InterruptMask;

/// Resting accelerometer reading: 1 g on the z axis.
const REST: Vector3 = Vector3::new(0, 0, 1_000);
/// Offset applied by a simulated jolt, comfortably above the default threshold.
const JOLT: i16 = 600;

/// Simulated board. Console commands poke the sensor side; the core drives
/// the actuator side and the emulator reports what changed.
#[derive(Debug)]
pub struct SimBoard {
    pub engaged: bool,
    pub mask: InterruptMask,
    pub screen: Option<Screen>,
    pub phone_inside: bool,
    pub lid_open: bool,
    dial: u16,
    accel: Vector3,
    knock: Option<bool>,
    scanning: bool,
    pending_screen: Option<Screen>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            engaged: false,
            mask: InterruptMask::default(),
            screen: None,
            phone_inside: false,
            lid_open: false,
            dial: 0,
            accel: REST,
            knock: None,
            scanning: false,
            pending_screen: None,
        }
    }

    pub fn rotate(&mut self) {
        self.dial = self.dial.wrapping_add(1);
    }

    /// Toggles between rest and a displaced reading so every call is a jolt.
    pub fn jolt(&mut self) {
        self.accel = if self.accel == REST {
            Vector3::new(JOLT, 0, REST.z + JOLT)
        } else {
            REST
        };
    }

    pub fn finish_knock(&mut self, matched: bool) {
        self.knock = Some(matched);
    }

    /// Screen rendered since the last call, if it differs from the one before.
    pub fn take_screen_change(&mut self) -> Option<Screen> {
        self.pending_screen.take()
    }
}

impl LockActuator for SimBoard {
    fn engage(&mut self) {
        self.engaged = true;
    }

    fn disengage(&mut self) {
        self.engaged = false;
    }
}

impl InterruptControl for SimBoard {
    fn apply_mask(&mut self, mask: InterruptMask) {
        self.mask = mask;
    }
}

impl DisplayPanel for SimBoard {
    fn render(&mut self, screen: Screen) {
        if self.screen != Some(screen) {
            self.pending_screen = Some(screen);
        }
        self.screen = Some(screen);
    }
}

impl PhoneSensor for SimBoard {
    fn begin_detect(&mut self) -> Result<(), SensorError> {
        // A new detect command abandons any scan a transition cut short.
        self.scanning = true;
        Ok(())
    }

    fn detect_ready(&mut self) -> bool {
        self.scanning
    }

    fn read_target(&mut self) -> bool {
        self.scanning = false;
        self.phone_inside
    }
}

impl MotionSensor for SimBoard {
    fn sample(&mut self) -> Option<Vector3> {
        Some(self.accel)
    }
}

impl DialEncoder for SimBoard {
    fn position(&mut self) -> u16 {
        self.dial
    }
}

impl LidSwitch for SimBoard {
    fn is_open(&mut self) -> bool {
        self.lid_open
    }
}

impl KnockDetector for SimBoard {
    fn verdict(&mut self) -> Option<bool> {
        self.knock.take()
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}
