#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for the software waveform engine driving servo channels.

use std::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;
use servo_envoy::pin_activity::PinActivity;
use servo_envoy::servo::ServoChannel;
use servo_envoy::waveform::{Level, RunMode, SoftWaveform, WaveformEngine};
use servo_envoy::Error;

// Each test runs on its own thread, so a thread-local clock keeps tests independent.
thread_local! {
    static NOW_US: Cell<u64> = const { Cell::new(0) };
}

fn now_us() -> u64 {
    NOW_US.with(Cell::get)
}

fn set_now_us(now_us: u64) {
    NOW_US.with(|now| now.set(now_us));
}

/// Pin levels as seen by whoever owns the outputs, with the time each change happened.
#[derive(Default)]
struct Pins {
    changes: RefCell<Vec<(u64, u8, Level)>>,
}

impl Pins {
    fn poll<const N: usize>(&self, engine: &SoftWaveform<N>) -> Option<u64> {
        let now = now_us();
        engine.poll(|pin, level| self.changes.borrow_mut().push((now, pin, level)))
    }

    fn changes_for(&self, pin: u8) -> Vec<(u64, Level)> {
        self.changes
            .borrow()
            .iter()
            .filter(|(_, changed_pin, _)| *changed_pin == pin)
            .map(|(at_us, _, level)| (*at_us, *level))
            .collect()
    }

    fn level(&self, pin: u8) -> Option<Level> {
        self.changes_for(pin).last().map(|(_, level)| *level)
    }
}

/// Advances the fake clock and keeps the engine polled, like the device loop on an
/// interrupt executor would while thread mode blocks.
struct SimulatedDelay<'a, const N: usize> {
    engine: &'a SoftWaveform<N>,
    pins: &'a Pins,
}

impl<const N: usize> DelayNs for SimulatedDelay<'_, N> {
    fn delay_ns(&mut self, ns: u32) {
        let end_us = now_us() + u64::from(ns / 1_000);
        while let Some(due_us) = self.pins.poll(self.engine).filter(|due_us| *due_us <= end_us) {
            set_now_us(due_us);
        }
        set_now_us(end_us);
        self.pins.poll(self.engine);
    }
}

/// Run the engine until `until_us`, applying every edge at its due time.
fn run_until<const N: usize>(engine: &SoftWaveform<N>, pins: &Pins, until_us: u64) {
    SimulatedDelay { engine, pins }.delay_us(u32::try_from(until_us - now_us()).unwrap());
}

#[test]
fn engine_produces_a_50_hz_servo_pulse() {
    static ENGINE: SoftWaveform<4> = SoftWaveform::new(now_us);
    set_now_us(0);
    let pins = Pins::default();

    ENGINE
        .start_waveform(5, 1_500, 18_500, RunMode::Repeat)
        .unwrap();
    run_until(&ENGINE, &pins, 40_000);

    assert_eq!(
        pins.changes_for(5),
        [
            (0, Level::High),
            (1_500, Level::Low),
            (20_000, Level::High),
            (21_500, Level::Low),
            (40_000, Level::High),
        ]
    );
}

#[test]
fn schedule_changes_are_flagged_for_the_device_loop() {
    // `take_changed` is the polling view of the signal the device loop awaits.
    let engine = SoftWaveform::<4>::new(now_us);
    set_now_us(0);

    assert!(!engine.take_changed());
    engine.configure_output_low(3);
    assert!(engine.take_changed());
    assert!(!engine.take_changed());

    engine.stop_waveform(3);
    assert!(engine.take_changed());
}

#[test]
fn engine_reports_table_errors() {
    let engine = SoftWaveform::<1>::new(now_us);
    set_now_us(0);

    engine.start_waveform(1, 1_500, 18_500, RunMode::Repeat).unwrap();
    assert_eq!(
        engine.start_waveform(2, 1_500, 18_500, RunMode::Repeat),
        Err(Error::WaveformTableFull)
    );
    assert_eq!(
        engine.start_waveform(99, 1_500, 18_500, RunMode::Repeat),
        Err(Error::PinOutOfRange { pin: 99 })
    );
    assert_eq!(engine.len(), 1);
}

#[test]
fn servo_attach_write_detach_on_the_soft_engine() {
    let engine = SoftWaveform::<4>::new(now_us);
    set_now_us(0);
    let pins = Pins::default();
    let activity = PinActivity::new();
    let delay = SimulatedDelay {
        engine: &engine,
        pins: &pins,
    };
    let mut servo = ServoChannel::with_activity(&engine, delay, &activity);

    servo.attach(11);
    run_until(&engine, &pins, 10_000);
    assert_eq!(
        pins.changes_for(11),
        [(0, Level::Low), (0, Level::High), (1_500, Level::Low)]
    );
    assert!(engine.is_running(11));
    assert!(activity.is_active(11));

    servo.write(180);
    run_until(&engine, &pins, 30_000);
    assert_eq!(
        pins.changes_for(11)[3..],
        [(20_000, Level::High), (22_000, Level::Low)]
    );

    servo.detach();
    assert_eq!(pins.level(11), Some(Level::Low));
    assert!(engine.is_empty());
    assert!(!activity.is_active(11));
    // Detach blocked for one refresh period.
    assert_eq!(now_us(), 50_000);

    run_until(&engine, &pins, 100_000);
    assert!(
        pins.changes_for(11)
            .iter()
            .all(|(at_us, level)| *at_us <= 50_000 || *level == Level::Low)
    );
}

#[test]
fn detach_mid_pulse_lets_the_pulse_finish() {
    let engine = SoftWaveform::<4>::new(now_us);
    set_now_us(0);
    let pins = Pins::default();
    let activity = PinActivity::new();
    let delay = SimulatedDelay {
        engine: &engine,
        pins: &pins,
    };
    let mut servo = ServoChannel::with_activity(&engine, delay, &activity);
    servo.attach_with_bounds_and_value(6, 1_000, 2_000, 2_000);
    run_until(&engine, &pins, 20_500);
    assert_eq!(pins.level(6), Some(Level::High));

    servo.detach();

    let changes = pins.changes_for(6);
    assert!(changes.contains(&(22_000, Level::Low)));
    assert_eq!(pins.level(6), Some(Level::Low));
    assert!(!engine.is_running(6));
}

#[test]
fn channels_on_one_engine_pulse_independently() {
    let engine = SoftWaveform::<4>::new(now_us);
    set_now_us(0);
    let pins = Pins::default();
    let activity = PinActivity::new();
    let mut left = ServoChannel::with_activity(
        &engine,
        SimulatedDelay {
            engine: &engine,
            pins: &pins,
        },
        &activity,
    );
    let mut right = ServoChannel::with_activity(
        &engine,
        SimulatedDelay {
            engine: &engine,
            pins: &pins,
        },
        &activity,
    );

    left.attach_with_bounds_and_value(2, 1_000, 2_000, 0);
    right.attach_with_bounds_and_value(3, 1_000, 2_000, 180);
    run_until(&engine, &pins, 19_000);

    assert_eq!(
        pins.changes_for(2),
        [(0, Level::Low), (0, Level::High), (1_000, Level::Low)]
    );
    assert_eq!(
        pins.changes_for(3),
        [(0, Level::Low), (0, Level::High), (2_000, Level::Low)]
    );
    assert_eq!(engine.len(), 2);
    assert_eq!(activity.bits(), (1 << 2) | (1 << 3));
}
