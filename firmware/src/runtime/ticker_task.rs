use embassy_time::{Duration, Ticker};
use lockbox_core::Clock;

#[embassy_executor::task]
pub async fn run(clock: &'static Clock) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(1));
    loop {
        ticker.next().await;
        clock.advance();
    }
}
