//! Hobby servo control for Pico 1 and 2, with many servos sharing one software timer.
//!
//! Start with [`servo::ServoChannel`]. Channels register their pulse trains with a
//! [`waveform::WaveformEngine`]; [`waveform::SoftWaveform`] is the software engine that
//! ships with the crate.
//!
//! # Glossary
//!
//! - **Pulse width:** how long, in microseconds, the output is held high each cycle. It
//!   encodes the servo's commanded position.
//! - **Refresh interval:** the fixed 20 ms (50 Hz) period at which the pulse repeats.
//! - **Waveform engine:** a generator that produces independent periodic high/low patterns
//!   on many pins from one time base.
//! - **Activity bitmap:** one flag per pin, mirroring whether a channel currently has a
//!   waveform registered there. See [`pin_activity::PinActivity`].
#![cfg_attr(not(feature = "host"), no_std)]
#![cfg_attr(not(feature = "host"), no_main)]

// Compile-time checks: an embedded architecture needs exactly one board.
#[cfg(all(feature = "arm", not(any(feature = "pico1", feature = "pico2"))))]
compile_error!("Must enable exactly one board feature: 'pico1' or 'pico2'");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Cannot enable both 'pico1' and 'pico2' features simultaneously");

#[cfg(all(feature = "host", any(feature = "pico1", feature = "pico2")))]
compile_error!("The 'host' feature cannot be combined with a board feature");

// Logging macros must come before the modules that use them.
#[macro_use]
mod fmt;

mod error;
pub mod pin_activity;
pub mod servo;
pub mod waveform;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
