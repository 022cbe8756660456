//! Crate-wide error type.

use derive_more::{Debug, Display, Error};

/// Errors reported by waveform engines.
///
/// Servo channels never surface these to callers: inputs are clamped rather than
/// rejected, and a rejected waveform registration is logged and mirrored in
/// [`PinActivity`](crate::pin_activity::PinActivity).
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq, defmt::Format)]
pub enum Error {
    /// The pin has no bit in the 64-pin activity bitmap.
    #[display("pin {pin} is out of range")]
    PinOutOfRange {
        /// Pin that was requested.
        pin: u8,
    },
    /// Every slot of the waveform table is already in use by another pin.
    #[display("waveform table is full")]
    WaveformTableFull,
    /// High time plus low time is zero, so the waveform has no period.
    #[display("waveform period is zero")]
    ZeroPeriod,
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
