//! Process-wide record of which pins have a registered waveform.
//!
//! See [`PinActivity`] for details.

use portable_atomic::{AtomicU64, Ordering};

/// Number of pins the bitmap can track (one bit each).
pub const MAX_PINS: u8 = 64;

static PIN_ACTIVITY: PinActivity = PinActivity::new();

/// One bit per pin, set while a servo channel has a waveform registered on that pin.
///
/// The bitmap mirrors what channels have asked the waveform engine to do. It does not
/// arbitrate between channels: two channels attached to the same pin simply overwrite
/// each other's bit.
///
/// Updates are single atomic read-modify-write operations, so channels running in
/// different execution contexts (thread mode and an interrupt executor, say) cannot
/// clobber each other's bits.
///
/// Most code uses the shared instance from [`PinActivity::global`]. Tests and
/// multi-engine setups can construct their own and hand it to
/// [`ServoChannel::with_activity`](crate::servo::ServoChannel::with_activity).
///
/// # Example
///
/// ```rust
/// use servo_envoy::pin_activity::PinActivity;
///
/// let activity = PinActivity::new();
/// activity.set(4);
/// activity.set(15);
/// activity.clear(4);
///
/// assert!(!activity.is_active(4));
/// assert!(activity.is_active(15));
/// assert_eq!(activity.bits(), 1 << 15);
/// ```
#[derive(Debug)]
pub struct PinActivity {
    bits: AtomicU64,
}

impl PinActivity {
    /// Create an empty bitmap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
        }
    }

    /// The bitmap shared by every channel created with
    /// [`ServoChannel::new`](crate::servo::ServoChannel::new).
    #[must_use]
    pub fn global() -> &'static Self {
        &PIN_ACTIVITY
    }

    /// Mark `pin` as generating a waveform. Pins without a bit are ignored.
    pub fn set(&self, pin: u8) {
        if let Some(mask) = pin_mask(pin) {
            self.bits.fetch_or(mask, Ordering::AcqRel);
        }
    }

    /// Mark `pin` as idle. Pins without a bit are ignored.
    pub fn clear(&self, pin: u8) {
        if let Some(mask) = pin_mask(pin) {
            self.bits.fetch_and(!mask, Ordering::AcqRel);
        }
    }

    /// Whether `pin` currently has a waveform registered.
    #[must_use]
    pub fn is_active(&self, pin: u8) -> bool {
        pin_mask(pin).is_some_and(|mask| self.bits.load(Ordering::Acquire) & mask != 0)
    }

    /// Snapshot of the whole bitmap; bit `n` is pin `n`.
    #[must_use]
    pub fn bits(&self) -> u64 {
        self.bits.load(Ordering::Acquire)
    }

    /// Number of pins currently marked active.
    #[must_use]
    pub fn active_count(&self) -> u32 {
        self.bits().count_ones()
    }
}

impl Default for PinActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit for `pin`, or `None` when the pin is past [`MAX_PINS`].
pub(crate) const fn pin_mask(pin: u8) -> Option<u64> {
    if pin < MAX_PINS {
        Some(1_u64 << pin)
    } else {
        None
    }
}
