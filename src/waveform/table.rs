//! Slot table behind the software waveform engine.
//!
//! See [`WaveformTable`] for details.

use crate::pin_activity::{MAX_PINS, pin_mask};
use crate::waveform::{Level, RunMode};
use crate::{Error, Result};

/// The next thing that happens to a slot's pin.
#[derive(Clone, Copy, Debug, Eq, PartialEq, defmt::Format)]
enum Edge {
    Rise,
    Fall,
    CycleEnd,
    Idle,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    pin: u8,
    high_us: u32,
    low_us: u32,
    run_mode: RunMode,
    edge: Edge,
    due_us: u64,
    // Whether a rising edge has happened under the current request. A `Once` request
    // that arrives mid-cycle lets that cycle finish, then runs one full cycle of its own.
    started: bool,
}

impl Slot {
    fn period_us(&self) -> u64 {
        u64::from(self.high_us).saturating_add(u64::from(self.low_us))
    }

    fn advance(&mut self, now_us: u64, set_level: &mut impl FnMut(u8, Level)) {
        while self.edge != Edge::Idle && self.due_us <= now_us {
            match self.edge {
                Edge::Rise => {
                    self.started = true;
                    if self.high_us > 0 {
                        set_level(self.pin, Level::High);
                    }
                    self.edge = Edge::Fall;
                    self.due_us = self.due_us.saturating_add(u64::from(self.high_us));
                }
                Edge::Fall => {
                    set_level(self.pin, Level::Low);
                    self.edge = Edge::CycleEnd;
                    self.due_us = self.due_us.saturating_add(u64::from(self.low_us));
                }
                Edge::CycleEnd => {
                    if self.run_mode == RunMode::Once && self.started {
                        self.edge = Edge::Idle;
                    } else {
                        self.edge = Edge::Rise;
                        // Missed whole periods are dropped rather than replayed.
                        if now_us.saturating_sub(self.due_us) >= self.period_us() {
                            self.due_us = now_us;
                        }
                    }
                }
                Edge::Idle => {}
            }
        }
    }
}

/// Fixed-capacity table of per-pin waveforms sharing one time base.
///
/// Each occupied slot describes a pulse train on one pin: high for `high_us`, then low for
/// `low_us`, either repeating or running a single cycle. [`poll`](Self::poll) is called
/// with the current time and reports every level change that has come due, then returns
/// the time of the next one. Whoever owns the pins (for example,
/// [`soft_waveform_device_loop`](crate::waveform::soft_waveform_device_loop)) applies the
/// levels and sleeps until that deadline.
///
/// Times are microseconds on a monotonic clock chosen by the caller.
///
/// # Example
///
/// ```rust
/// use servo_envoy::waveform::{Level, RunMode, WaveformTable};
///
/// let mut table = WaveformTable::<4>::new();
/// table.start(2, 1_500, 18_500, RunMode::Repeat, 0)?;
///
/// let mut levels = Vec::new();
/// let next_due = table.poll(0, |pin, level| levels.push((pin, level)));
///
/// assert_eq!(levels, [(2, Level::High)]);
/// assert_eq!(next_due, Some(1_500));
/// # Ok::<(), servo_envoy::Error>(())
/// ```
#[derive(Debug)]
pub struct WaveformTable<const N: usize> {
    slots: [Option<Slot>; N],
    pending_low: u64,
}

impl<const N: usize> WaveformTable<N> {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [None; N],
            pending_low: 0,
        }
    }

    /// Register or replace the waveform on `pin`.
    ///
    /// A pin without a slot gets one, with its first rising edge due at `now_us`.
    /// A pin that already has a slot keeps its place in the current cycle; the new
    /// timings take effect from the next edge.
    ///
    /// # Errors
    ///
    /// - [`Error::PinOutOfRange`] if `pin` has no activity bit.
    /// - [`Error::ZeroPeriod`] if both `high_us` and `low_us` are zero.
    /// - [`Error::WaveformTableFull`] if the pin needs a slot and none is free.
    pub fn start(
        &mut self,
        pin: u8,
        high_us: u32,
        low_us: u32,
        run_mode: RunMode,
        now_us: u64,
    ) -> Result<()> {
        if pin_mask(pin).is_none() {
            return Err(Error::PinOutOfRange { pin });
        }
        if high_us == 0 && low_us == 0 {
            return Err(Error::ZeroPeriod);
        }

        if let Some(slot) = self.slot_mut(pin) {
            slot.high_us = high_us;
            slot.low_us = low_us;
            slot.run_mode = run_mode;
            slot.started = false;
            if slot.edge == Edge::Idle {
                slot.edge = Edge::Rise;
                slot.due_us = now_us;
            }
            return Ok(());
        }

        let free = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(Error::WaveformTableFull)?;
        *free = Some(Slot {
            pin,
            high_us,
            low_us,
            run_mode,
            edge: Edge::Rise,
            due_us: now_us,
            started: false,
        });
        Ok(())
    }

    /// Free the slot for `pin` and queue a low level for it.
    ///
    /// Returns whether the pin had a slot.
    pub fn stop(&mut self, pin: u8) -> bool {
        self.request_low(pin);
        self.slots
            .iter_mut()
            .find(|slot| slot.is_some_and(|slot| slot.pin == pin))
            .map(Option::take)
            .is_some()
    }

    /// Queue a low level for `pin`, emitted on the next [`poll`](Self::poll).
    pub fn request_low(&mut self, pin: u8) {
        if let Some(mask) = pin_mask(pin) {
            self.pending_low |= mask;
        }
    }

    /// Emit every level change due at or before `now_us` and return the next deadline.
    ///
    /// Queued lows come first (lowest pin first), then each slot's edges in time order.
    /// Returns `None` when no slot has anything scheduled.
    pub fn poll(&mut self, now_us: u64, mut set_level: impl FnMut(u8, Level)) -> Option<u64> {
        let pending = core::mem::take(&mut self.pending_low);
        if pending != 0 {
            for pin in 0..MAX_PINS {
                if pin_mask(pin).is_some_and(|mask| pending & mask != 0) {
                    set_level(pin, Level::Low);
                }
            }
        }

        for slot in self.slots.iter_mut().flatten() {
            slot.advance(now_us, &mut set_level);
        }

        self.next_deadline()
    }

    /// Earliest time at which some slot has an edge due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.edge != Edge::Idle)
            .map(|slot| slot.due_us)
            .min()
    }

    /// Whether `pin` has a waveform that is still producing edges.
    ///
    /// A finished [`RunMode::Once`] waveform keeps its slot until stopped but is not running.
    #[must_use]
    pub fn is_running(&self, pin: u8) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|slot| slot.pin == pin && slot.edge != Edge::Idle)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of pins the table can drive at once.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    fn slot_mut(&mut self, pin: u8) -> Option<&mut Slot> {
        self.slots.iter_mut().flatten().find(|slot| slot.pin == pin)
    }
}

impl<const N: usize> Default for WaveformTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
