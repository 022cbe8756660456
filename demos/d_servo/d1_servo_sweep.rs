#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_time::{Delay, Timer};
use servo_envoy::servo::ServoChannel;
use servo_envoy::waveform::{SoftWaveform, embassy_clock_us, soft_waveform_device_loop};
use {defmt::info, defmt_rtt as _, panic_probe as _};

const LEFT_PIN: u8 = 11;
const RIGHT_PIN: u8 = 12;

static SOFT_WAVEFORM: SoftWaveform<4> = SoftWaveform::new(embassy_clock_us);

// The waveform edges must keep coming while thread mode blocks in `detach`.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
#[expect(unsafe_code, reason = "interrupt handlers are unsafe to declare")]
unsafe fn SWI_IRQ_1() {
    // SAFETY: SWI_IRQ_1 is reserved for this executor.
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[embassy_executor::task]
async fn soft_waveform_task(outputs: [(u8, Output<'static>); 2]) -> ! {
    soft_waveform_device_loop(&SOFT_WAVEFORM, outputs).await
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner_high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    let outputs = [
        (LEFT_PIN, Output::new(p.PIN_11, Level::Low)),
        (RIGHT_PIN, Output::new(p.PIN_12, Level::Low)),
    ];
    defmt::unwrap!(spawner_high.spawn(soft_waveform_task(outputs)));

    // Two servos share one engine. The right one is a wide-range servo.
    let mut left = ServoChannel::new(&SOFT_WAVEFORM, Delay);
    let mut right = ServoChannel::new(&SOFT_WAVEFORM, Delay);
    left.attach(LEFT_PIN);
    right.attach_with_bounds_and_value(RIGHT_PIN, 544, 2_400, 90);
    info!(
        "Servos attached: left {}..{} us, right {}..{} us",
        left.min_microseconds(),
        left.max_microseconds(),
        right.min_microseconds(),
        right.max_microseconds()
    );

    loop {
        // Sweep in opposite directions, 10 degrees at a time. Include 180 degrees.
        for degrees in (0..=180).step_by(10) {
            left.write(degrees);
            right.write(180 - degrees);
            Timer::after_millis(100).await;
        }
        info!(
            "left at {} degrees ({} us), right at {} degrees ({} us)",
            left.read(),
            left.read_microseconds(),
            right.read(),
            right.read_microseconds()
        );

        // Raw pulse widths at or above 200 are microseconds.
        left.write(1_250);
        right.center();
        Timer::after_millis(400).await;

        // Release the left servo for a second, then pick it up again at its last position.
        let position = left.read();
        left.detach();
        info!("left detached: {}", left.is_attached());
        Timer::after_secs(1).await;
        left.attach_with_bounds_and_value(LEFT_PIN, 1_000, 2_000, position);
    }
}
