//! Shared waveform engine: many independently timed outputs from one time base.
//!
//! [`ServoChannel`](crate::servo::ServoChannel) talks to any [`WaveformEngine`]. This module
//! also provides [`SoftWaveform`], a software engine that multiplexes up to `N` pins off a
//! single clock, and (on Pico builds) [`soft_waveform_device_loop`], the task that drives the
//! GPIO outputs for it.
//!
//! # Example
//!
//! ```rust,ignore
//! # #![no_std]
//! # #![no_main]
//! use embassy_rp::gpio::{Level, Output};
//! use servo_envoy::waveform::{SoftWaveform, embassy_clock_us, soft_waveform_device_loop};
//!
//! static SOFT_WAVEFORM: SoftWaveform<4> = SoftWaveform::new(embassy_clock_us);
//!
//! // Embassy tasks cannot be generic, so wrap the device loop in a concrete task.
//! #[embassy_executor::task]
//! async fn soft_waveform_task(outputs: [(u8, Output<'static>); 2]) -> ! {
//!     soft_waveform_device_loop(&SOFT_WAVEFORM, outputs).await
//! }
//!
//! async fn example(p: embassy_rp::Peripherals, spawner: embassy_executor::SendSpawner) {
//!     let outputs = [
//!         (11, Output::new(p.PIN_11, Level::Low)),
//!         (12, Output::new(p.PIN_12, Level::Low)),
//!     ];
//!     spawner.must_spawn(soft_waveform_task(outputs));
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::Result;

pub mod table;

pub use table::WaveformTable;

/// Whether a waveform repeats or runs a single cycle.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, defmt::Format)]
pub enum RunMode {
    /// Repeat the high/low cycle until replaced or stopped.
    Repeat,
    /// Run one high/low cycle, then leave the pin low.
    Once,
}

/// Logic level of an output pin.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, defmt::Format)]
pub enum Level {
    /// Driven low.
    Low,
    /// Driven high.
    High,
}

/// A pulse-train generator shared by many output pins.
///
/// Every method takes `&self`: one engine serves all channels, and implementations
/// serialize their own bookkeeping.
pub trait WaveformEngine {
    /// Configure `pin` as a digital output and drive it low.
    fn configure_output_low(&self, pin: u8);

    /// Start (or replace) the waveform on `pin`: high for `high_us`, low for `low_us`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot take the registration, for example because
    /// the pin is out of range or every slot is in use.
    fn start_waveform(
        &self,
        pin: u8,
        high_us: u32,
        low_us: u32,
        run_mode: RunMode,
    ) -> Result<()>;

    /// Stop any waveform on `pin`, leaving it low.
    fn stop_waveform(&self, pin: u8);
}

/// Software [`WaveformEngine`] for up to `N` pins, timed by one microsecond clock.
///
/// The engine only keeps the schedule. Something that owns the pins must call
/// [`poll`](Self::poll) whenever a deadline passes or the schedule changes; on Pico builds
/// that is [`soft_waveform_device_loop`]. Run that loop on an interrupt executor so that
/// blocking waits in thread mode, such as
/// [`ServoChannel::detach`](crate::servo::ServoChannel::detach), cannot stall it.
///
/// The clock is any monotonic microsecond counter. On Pico builds use [`embassy_clock_us`].
pub struct SoftWaveform<const N: usize> {
    table: Mutex<CriticalSectionRawMutex, RefCell<WaveformTable<N>>>,
    changed: Signal<CriticalSectionRawMutex, ()>,
    now_us: fn() -> u64,
}

impl<const N: usize> SoftWaveform<N> {
    /// Create an engine with no waveforms, timed by `now_us`.
    #[must_use]
    pub const fn new(now_us: fn() -> u64) -> Self {
        Self {
            table: Mutex::new(RefCell::new(WaveformTable::new())),
            changed: Signal::new(),
            now_us,
        }
    }

    /// Apply every level change that is due now and return the next deadline.
    ///
    /// `set_level` runs inside a critical section and must not call back into the engine.
    pub fn poll(&self, set_level: impl FnMut(u8, Level)) -> Option<u64> {
        let now_us = (self.now_us)();
        self.table
            .lock(|table| table.borrow_mut().poll(now_us, set_level))
    }

    /// Whether `pin` has a waveform that is still producing edges.
    #[must_use]
    pub fn is_running(&self, pin: u8) -> bool {
        self.table.lock(|table| table.borrow().is_running(pin))
    }

    /// Number of pins holding a slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock(|table| table.borrow().len())
    }

    /// Whether no pin holds a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the schedule changed since the last call, clearing the flag.
    ///
    /// For drivers that poll instead of awaiting the device loop's wake signal.
    #[doc(hidden)]
    #[must_use]
    pub fn take_changed(&self) -> bool {
        self.changed.try_take().is_some()
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut WaveformTable<N>) -> R) -> R {
        let result = self.table.lock(|table| f(&mut table.borrow_mut()));
        self.changed.signal(());
        result
    }
}

impl<const N: usize> WaveformEngine for SoftWaveform<N> {
    fn configure_output_low(&self, pin: u8) {
        self.with_table(|table| table.request_low(pin));
    }

    fn start_waveform(
        &self,
        pin: u8,
        high_us: u32,
        low_us: u32,
        run_mode: RunMode,
    ) -> Result<()> {
        let now_us = (self.now_us)();
        self.with_table(|table| table.start(pin, high_us, low_us, run_mode, now_us))
    }

    fn stop_waveform(&self, pin: u8) {
        self.with_table(|table| table.stop(pin));
    }
}

/// Microseconds since boot from the embassy time driver, for [`SoftWaveform::new`].
#[cfg(any(feature = "pico1", feature = "pico2"))]
#[must_use]
pub fn embassy_clock_us() -> u64 {
    embassy_time::Instant::now().as_micros()
}

#[cfg(any(feature = "pico1", feature = "pico2"))]
impl From<Level> for embassy_rp::gpio::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => Self::Low,
            Level::High => Self::High,
        }
    }
}

// Must be `pub` because the concrete task wrapper lives in the application crate.
/// Device loop that drives GPIO outputs from a [`SoftWaveform`].
///
/// Each output is paired with the pin number channels use for it. Level changes for
/// pins without an output are ignored.
///
/// Since embassy tasks cannot be generic, wrap this in a concrete
/// `#[embassy_executor::task]`. See the [module documentation](self) for an example.
#[cfg(any(feature = "pico1", feature = "pico2"))]
pub async fn soft_waveform_device_loop<const N: usize, const P: usize>(
    soft_waveform: &'static SoftWaveform<N>,
    mut outputs: [(u8, embassy_rp::gpio::Output<'static>); P],
) -> ! {
    use embassy_futures::select::select;
    use embassy_time::{Instant, Timer};

    info!("soft_waveform_device_loop: task started with {} outputs", P);
    loop {
        let next_due_us = soft_waveform.poll(|pin, level| {
            if let Some((_, output)) = outputs
                .iter_mut()
                .find(|(output_pin, _)| *output_pin == pin)
            {
                output.set_level(level.into());
            }
        });

        match next_due_us {
            Some(due_us) => {
                select(
                    Timer::at(Instant::from_micros(due_us)),
                    soft_waveform.changed.wait(),
                )
                .await;
            }
            None => soft_waveform.changed.wait().await,
        }
    }
}
