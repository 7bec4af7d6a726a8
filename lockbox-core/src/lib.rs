#![no_std]

// Control core for the phone lock box.
//
// The crate avoids the standard library so the same scheduler and state
// machine run in the MCU firmware, the host emulator and the tests. Hardware
// stays behind the traits in `hal`.

pub mod config;
pub mod console;
pub mod flags;
pub mod hal;
pub mod journal;
pub mod lockbox;
pub mod machine;
pub mod scheduler;
pub mod sensors;
pub mod tasks;
pub mod time;

pub use config::Config;
pub use flags::{Flag, FlagSet, SharedFlags};
pub use lockbox::LockBox;
pub use machine::{BoxMode, BoxState, MachineError, StateMachine};
pub use scheduler::{EventLabel, EventMode, RegisterError, Scheduler};
pub use tasks::Task;
pub use time::{Clock, Millis};
