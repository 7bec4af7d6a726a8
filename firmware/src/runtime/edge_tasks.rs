//! EXTI edge handlers. Each task stands in for one interrupt line.

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Input;
use portable_atomic::Ordering;

use super::{CLOCK, ENCODER, FLAGS, GATE, KNOCK};

#[embassy_executor::task]
pub async fn button(mut pin: ExtiInput<'static>) -> ! {
    loop {
        pin.wait_for_falling_edge().await;
        GATE.on_button(&FLAGS);
    }
}

#[embassy_executor::task]
pub async fn audio(mut pin: ExtiInput<'static>) -> ! {
    loop {
        pin.wait_for_rising_edge().await;
        // Every edge counts toward a knock, masked or not.
        KNOCK.record_edge(CLOCK.now());
        GATE.on_audio(&FLAGS);
    }
}

/// Quadrature decode on channel A edges, direction from channel B.
#[embassy_executor::task]
pub async fn encoder(mut channel_a: ExtiInput<'static>, channel_b: Input<'static>) -> ! {
    loop {
        channel_a.wait_for_rising_edge().await;
        if channel_b.is_high() {
            ENCODER.fetch_sub(1, Ordering::AcqRel);
        } else {
            ENCODER.fetch_add(1, Ordering::AcqRel);
        }
    }
}
