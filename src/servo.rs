//! A device abstraction for hobby servos driven by a shared waveform engine.
//!
//! Each [`ServoChannel`] owns one output pin's pulse width and registers a 50 Hz pulse train
//! for it with a [`WaveformEngine`]. Many channels share one engine (and so one timer), and
//! all of them mirror their registrations in the process-wide
//! [`PinActivity`](crate::pin_activity::PinActivity) bitmap.
//!
//! See [`ServoChannel`] for usage examples.

use embedded_hal::delay::DelayNs;

use crate::pin_activity::PinActivity;
use crate::waveform::{RunMode, WaveformEngine};

/// Period of the servo pulse train (microseconds): 50 Hz.
pub const REFRESH_INTERVAL_US: u32 = 20_000;

/// Shortest pulse width any channel will ever emit (microseconds).
pub const MIN_PULSE_FLOOR_US: u16 = 200;

/// Longest pulse width any channel will ever emit (microseconds).
pub const MAX_PULSE_CEILING_US: u16 = 3_000;

/// Smallest value an attach call may set as the upper bound (microseconds).
pub const MAX_PULSE_FLOOR_US: u16 = 250;

/// [`ServoChannel::write`] values below this are degrees; at or above, microseconds.
pub const ANGLE_THRESHOLD: i32 = 200;

/// Default lower bound used by [`ServoChannel::attach`] (microseconds).
pub const DEFAULT_MIN_PULSE_WIDTH_US: u16 = 1_000;

/// Default upper bound used by [`ServoChannel::attach`] (microseconds).
pub const DEFAULT_MAX_PULSE_WIDTH_US: u16 = 2_000;

/// Pulse width of a new or detached channel (microseconds).
pub const DEFAULT_NEUTRAL_PULSE_WIDTH_US: u16 = 1_500;

const MAX_DEGREES: i32 = 180;

/// Rescale `value` from `[min_in, max_in]` to `[min_out, max_out]` with half-unit rounding.
///
/// The numerator is doubled, one is added after the division, and the sum is halved again.
/// Compared with a plain integer rescale this rounds to nearest, so mapping a value and
/// mapping the result back lands on the same output. Servo channels rely on that when
/// converting between degrees and microseconds.
///
/// An empty input range maps everything to `min_out`. The arithmetic is done in `i128`,
/// so any `i32` inputs are accepted; results past the `i32` range saturate.
///
/// # Example
///
/// ```rust
/// use servo_envoy::servo::symmetric_map;
///
/// let us = symmetric_map(90, 0, 180, 1000, 2000);
/// assert_eq!(us, 1500);
/// assert_eq!(symmetric_map(us, 1000, 2000, 0, 180), 90);
/// ```
#[must_use]
pub const fn symmetric_map(value: i32, min_in: i32, max_in: i32, min_out: i32, max_out: i32) -> i32 {
    // `From` is not const, so widen with `as`; every i32 fits in i128.
    let range_in = max_in as i128 - min_in as i128;
    if range_in == 0 {
        return min_out;
    }
    let range_out = max_out as i128 - min_out as i128;
    let delta_in = value as i128 - min_in as i128;
    let mapped = ((delta_in * range_out * 2) / range_in + 1) / 2 + min_out as i128;
    if mapped > i32::MAX as i128 {
        i32::MAX
    } else if mapped < i32::MIN as i128 {
        i32::MIN
    } else {
        // In range, checked above.
        mapped as i32
    }
}

/// A device abstraction for one hobby servo on a shared waveform engine.
///
/// A channel starts detached at the neutral pulse width. [`attach`](Self::attach) claims a
/// pin, drives it low, and starts a 20 ms pulse train; [`write`](Self::write) takes either
/// degrees (below 200) or microseconds; [`detach`](Self::detach) parks the pin low and
/// releases it. Dropping a channel detaches it.
///
/// Out-of-range inputs are clamped, never rejected: bounds to `[200, 3000]` µs, angles to
/// `[0, 180]`, and pulse widths to the channel's bounds. If the engine refuses a
/// registration the channel stays attached with no output, and the pin's
/// [`PinActivity`] bit stays clear.
///
/// # Examples
///
/// ```rust
/// use core::cell::Cell;
/// use embedded_hal::delay::DelayNs;
/// use servo_envoy::Result;
/// use servo_envoy::pin_activity::PinActivity;
/// use servo_envoy::servo::ServoChannel;
/// use servo_envoy::waveform::{RunMode, WaveformEngine};
///
/// // An engine that only remembers the last pulse width it was asked for.
/// #[derive(Default)]
/// struct LastPulse(Cell<u32>);
///
/// impl WaveformEngine for LastPulse {
///     fn configure_output_low(&self, _pin: u8) {}
///     fn start_waveform(&self, _pin: u8, high_us: u32, _low_us: u32, _mode: RunMode) -> Result<()> {
///         self.0.set(high_us);
///         Ok(())
///     }
///     fn stop_waveform(&self, _pin: u8) {}
/// }
///
/// struct NoDelay;
///
/// impl DelayNs for NoDelay {
///     fn delay_ns(&mut self, _ns: u32) {}
/// }
///
/// let engine = LastPulse::default();
/// let activity = PinActivity::new();
/// let mut servo = ServoChannel::with_activity(&engine, NoDelay, &activity);
///
/// servo.attach_with_bounds(15, 500, 2500);
/// servo.write(45);                // degrees
/// assert_eq!(engine.0.get(), 1000);
/// servo.write(2_000);             // microseconds
/// assert_eq!(servo.read(), 135);
/// assert!(activity.is_active(15));
///
/// servo.detach();                 // drive low, wait one period, release the pin
/// assert!(!servo.is_attached());
/// assert!(!activity.is_active(15));
/// ```
pub struct ServoChannel<'a, E, D>
where
    E: WaveformEngine,
    D: DelayNs,
{
    engine: &'a E,
    delay: D,
    activity: &'a PinActivity,
    pin: Option<u8>,
    min_us: u16,
    max_us: u16,
    current_us: u16,
}

impl<'a, E, D> ServoChannel<'a, E, D>
where
    E: WaveformEngine,
    D: DelayNs,
{
    /// Create a detached channel that records activity in [`PinActivity::global`].
    ///
    /// `delay` is used only by [`detach`](Self::detach).
    #[must_use]
    pub fn new(engine: &'a E, delay: D) -> Self {
        Self::with_activity(engine, delay, PinActivity::global())
    }

    /// Create a detached channel that records activity in `activity`.
    #[must_use]
    pub const fn with_activity(engine: &'a E, delay: D, activity: &'a PinActivity) -> Self {
        Self {
            engine,
            delay,
            activity,
            pin: None,
            min_us: DEFAULT_MIN_PULSE_WIDTH_US,
            max_us: DEFAULT_MAX_PULSE_WIDTH_US,
            current_us: DEFAULT_NEUTRAL_PULSE_WIDTH_US,
        }
    }

    /// Attach to `pin` with the default 1000–2000 µs bounds.
    ///
    /// The current pulse width is re-applied (clamped to the new bounds). Returns the pin the
    /// channel drives.
    ///
    /// See the [struct-level example](Self) for usage.
    pub fn attach(&mut self, pin: u8) -> u8 {
        self.attach_with_bounds(pin, DEFAULT_MIN_PULSE_WIDTH_US, DEFAULT_MAX_PULSE_WIDTH_US)
    }

    /// Attach to `pin` with custom pulse-width bounds in microseconds.
    ///
    /// The current pulse width is re-applied (clamped to the new bounds). Returns the pin the
    /// channel drives.
    ///
    /// See the [struct-level example](Self) for usage.
    pub fn attach_with_bounds(&mut self, pin: u8, min_us: u16, max_us: u16) -> u8 {
        let value = i32::from(self.current_us);
        self.attach_with_bounds_and_value(pin, min_us, max_us, value)
    }

    /// Attach to `pin` with custom bounds and an initial value.
    ///
    /// `value` is decoded like [`write`](Self::write). `max_us` is clamped to
    /// `[250, 3000]`, then `min_us` to `[200, max_us]`; both replace any earlier bounds.
    ///
    /// Only the first attach configures the pin. Attaching an already attached channel
    /// updates bounds and value but keeps the original pin. The return value is always the
    /// pin the channel drives, so on a mismatched re-attach it differs from `pin`; compare
    /// the two to detect that case.
    pub fn attach_with_bounds_and_value(
        &mut self,
        pin: u8,
        min_us: u16,
        max_us: u16,
        value: i32,
    ) -> u8 {
        let attached_pin = match self.pin {
            Some(attached_pin) => {
                if attached_pin != pin {
                    warn!(
                        "servo: attach to pin {} ignored, already on pin {}",
                        pin, attached_pin
                    );
                }
                attached_pin
            }
            None => {
                self.engine.configure_output_low(pin);
                self.pin = Some(pin);
                info!("servo: attached to pin {}", pin);
                pin
            }
        };

        self.max_us = max_us.clamp(MAX_PULSE_FLOOR_US, MAX_PULSE_CEILING_US);
        self.min_us = min_us.clamp(MIN_PULSE_FLOOR_US, self.max_us);

        self.write(value);
        attached_pin
    }

    /// Park the pin low and release it. Does nothing if not attached.
    ///
    /// Requests one low-only cycle, blocks for one refresh period (20 ms) so any pulse
    /// already in flight completes, then stops the waveform. The pulse width resets to
    /// [`DEFAULT_NEUTRAL_PULSE_WIDTH_US`].
    ///
    /// See the [struct-level example](Self) for usage.
    pub fn detach(&mut self) {
        let Some(pin) = self.pin.take() else {
            return;
        };

        self.activity.clear(pin);
        if let Err(err) = self
            .engine
            .start_waveform(pin, 0, REFRESH_INTERVAL_US, RunMode::Once)
        {
            warn!("servo: pin {} park request rejected: {}", pin, err);
        }
        self.delay.delay_ms(REFRESH_INTERVAL_US / 1_000);
        self.engine.stop_waveform(pin);

        self.current_us = DEFAULT_NEUTRAL_PULSE_WIDTH_US;
        info!("servo: detached from pin {}", pin);
    }

    /// Command a position: degrees when `value < 200`, microseconds otherwise.
    ///
    /// Degrees are clamped to `[0, 180]` and mapped onto the channel's bounds with
    /// [`symmetric_map`].
    ///
    /// See the [struct-level example](Self) for usage.
    pub fn write(&mut self, value: i32) {
        let us = if value < ANGLE_THRESHOLD {
            let degrees = value.clamp(0, MAX_DEGREES);
            symmetric_map(
                degrees,
                0,
                MAX_DEGREES,
                i32::from(self.min_us),
                i32::from(self.max_us),
            )
        } else {
            value
        };
        self.write_microseconds(us);
    }

    /// Command a pulse width in microseconds, clamped to the channel's bounds.
    ///
    /// While attached, the pin's waveform is re-registered as a repeating
    /// high-for-`us`, low-for-the-rest-of-20-ms pulse train. While detached, the value is
    /// only stored and takes effect on the next attach.
    pub fn write_microseconds(&mut self, value: i32) {
        let clamped = value.clamp(i32::from(self.min_us), i32::from(self.max_us));
        // The clamp keeps the value within the u16 bounds.
        self.current_us = u16::try_from(clamped).unwrap_or(self.max_us);

        let Some(pin) = self.pin else {
            return;
        };

        let high_us = u32::from(self.current_us);
        self.activity.clear(pin);
        match self.engine.start_waveform(
            pin,
            high_us,
            REFRESH_INTERVAL_US - high_us,
            RunMode::Repeat,
        ) {
            Ok(()) => {
                self.activity.set(pin);
                debug!("servo: pin {} pulse {}us", pin, self.current_us);
            }
            Err(err) => warn!("servo: pin {} waveform rejected: {}", pin, err),
        }
    }

    /// Move to the midpoint of the current bounds.
    pub fn center(&mut self) {
        let midpoint = self.min_us + (self.max_us - self.min_us) / 2;
        self.write_microseconds(i32::from(midpoint));
    }

    /// Current position in degrees `[0, 180]`.
    ///
    /// Uses the inverse of the mapping in [`write`](Self::write), so writing the result
    /// back reproduces the same pulse width.
    #[must_use]
    pub fn read(&self) -> i32 {
        symmetric_map(
            i32::from(self.current_us),
            i32::from(self.min_us),
            i32::from(self.max_us),
            0,
            MAX_DEGREES,
        )
    }

    /// Current pulse width in microseconds.
    #[must_use]
    pub const fn read_microseconds(&self) -> u16 {
        self.current_us
    }

    /// Whether the channel is attached to a pin.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.pin.is_some()
    }

    /// Pin the channel drives, if attached.
    #[must_use]
    pub const fn pin(&self) -> Option<u8> {
        self.pin
    }

    /// Lower pulse-width bound in microseconds.
    #[must_use]
    pub const fn min_microseconds(&self) -> u16 {
        self.min_us
    }

    /// Upper pulse-width bound in microseconds.
    #[must_use]
    pub const fn max_microseconds(&self) -> u16 {
        self.max_us
    }
}

impl<E, D> Drop for ServoChannel<'_, E, D>
where
    E: WaveformEngine,
    D: DelayNs,
{
    fn drop(&mut self) {
        self.detach();
    }
}
