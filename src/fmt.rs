//! Logging macros shared by every module.
//!
//! Embedded builds log through `defmt`. Host builds print to stdout so test output shows
//! driver activity. Builds with neither feature discard the message but still borrow the
//! arguments, keeping variables "used" in every configuration.
//!
//! Format strings must stick to plain `{}` placeholders so they parse under both
//! `defmt` and `core::fmt`.
#![allow(unused_macros, reason = "not every level is used in every build")]

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($s $(, $x)*);
        #[cfg(all(feature = "host", not(feature = "defmt")))]
        ::std::println!(concat!("DEBUG ", $s) $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "host")))]
        let _ = ($(&$x,)*);
    }};
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($s $(, $x)*);
        #[cfg(all(feature = "host", not(feature = "defmt")))]
        ::std::println!(concat!("INFO  ", $s) $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "host")))]
        let _ = ($(&$x,)*);
    }};
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($s $(, $x)*);
        #[cfg(all(feature = "host", not(feature = "defmt")))]
        ::std::println!(concat!("WARN  ", $s) $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "host")))]
        let _ = ($(&$x,)*);
    }};
}
