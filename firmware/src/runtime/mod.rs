use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_time::{Duration, Ticker};
use lockbox_core::{Clock, Config, LockBox, SharedFlags};
use portable_atomic::AtomicU16;

use crate::board::{Board, Shared};
use crate::irq::InterruptGate;
use crate::knock::SharedKnock;

mod edge_tasks;
mod journal;
mod ticker_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static FLAGS: SharedFlags = SharedFlags::new();
pub(super) static CLOCK: Clock = Clock::new();
pub(super) static GATE: InterruptGate = InterruptGate::new();
pub(super) static KNOCK: SharedKnock = SharedKnock::new();
pub(super) static ENCODER: AtomicU16 = AtomicU16::new(0);

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA6,
        PA8,
        PA9,
        PA10,
        PB0,
        PB6,
        PB7,
        EXTI0,
        EXTI8,
        EXTI9,
        I2C1,
        ..
    } = hal::init(config);

    let board = Board::new(
        Output::new(PA0, Level::Low, Speed::Low),
        Input::new(PA1, Pull::Up),
        Input::new(PA6, Pull::Up),
        I2c::new_blocking(I2C1, PB6, PB7, i2c::Config::default()),
        Shared {
            clock: &CLOCK,
            gate: &GATE,
            knock: &KNOCK,
            encoder: &ENCODER,
        },
    );

    spawner
        .spawn(ticker_task::run(&CLOCK))
        .expect("failed to spawn clock ticker");
    spawner
        .spawn(edge_tasks::button(ExtiInput::new(PA8, EXTI8, Pull::Up)))
        .expect("failed to spawn button task");
    spawner
        .spawn(edge_tasks::audio(ExtiInput::new(PB0, EXTI0, Pull::Down)))
        .expect("failed to spawn audio task");
    spawner
        .spawn(edge_tasks::encoder(
            ExtiInput::new(PA9, EXTI9, Pull::Up),
            Input::new(PA10, Pull::Up),
        ))
        .expect("failed to spawn encoder task");

    let mut lockbox = LockBox::new(&FLAGS, board, Config::default());
    lockbox.start(CLOCK.now());
    defmt::info!("lockbox: started in {}", lockbox.mode().name());

    let mut last_seen = journal::drain(lockbox.journal(), 0);
    let mut ticker = Ticker::every(Duration::from_millis(1));
    loop {
        lockbox.tick(CLOCK.now());
        last_seen = journal::drain(lockbox.journal(), last_seen);
        ticker.next().await;
    }
}
