//! Interrupt-enable gate shared between the control loop and the EXTI tasks.
//!
//! The state machine publishes its mask on every transition. Edge tasks
//! consult the gate before depositing a flag, so a masked source never reaches
//! the flag set.

use lockbox_core::machine::InterruptMask;
use lockbox_core::{Flag, SharedFlags};
use portable_atomic::{AtomicBool, Ordering};

pub struct InterruptGate {
    button: AtomicBool,
    audio: AtomicBool,
}

impl InterruptGate {
    pub const fn new() -> Self {
        Self {
            button: AtomicBool::new(false),
            audio: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, mask: InterruptMask) {
        self.button.store(mask.button, Ordering::Release);
        self.audio.store(mask.audio, Ordering::Release);
    }

    /// Dial button edge. Returns whether a flag was deposited.
    pub fn on_button(&self, flags: &SharedFlags) -> bool {
        self.button.load(Ordering::Acquire) && flags.insert(Flag::DialPressed)
    }

    /// Audio threshold edge. Returns whether a flag was deposited.
    pub fn on_audio(&self, flags: &SharedFlags) -> bool {
        self.audio.load(Ordering::Acquire) && flags.insert(Flag::AudioVolHigh)
    }
}

impl Default for InterruptGate {
    fn default() -> Self {
        Self::new()
    }
}
