//! Simulated hardware timer
//!
//! `SimHardwareTimer` stands in for the single-shot peripheral so that the
//! chaining logic can be driven deterministically. Nothing happens on its
//! own: the test advances the shared [`SimClock`] to the pending expiry with
//! [`SimHardwareTimer::advance_to_expiry`] (or [`fire_next`], which also
//! dispatches the owning timer).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{Error, Result};
use super::hardware::HardwareTimer;
use super::timer::LogicalTimer;

/// Free running counter shared by simulated timer slots
#[derive(Debug, Clone)]
pub struct SimClock {
    now: Arc<AtomicU32>,
    mask: u32,
}

impl SimClock {
    /// Creates a clock at zero with the given counter width mask
    pub fn new(mask: u32) -> Self {
        SimClock::starting_at(mask, 0)
    }

    /// Creates a clock whose counter starts at `start`
    pub fn starting_at(mask: u32, start: u32) -> Self {
        SimClock {
            now: Arc::new(AtomicU32::new(start & mask)),
            mask,
        }
    }

    /// Current counter value
    pub fn now(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }

    /// Moves the counter forward, wrapping at the counter width
    pub fn advance(&self, ticks: u32) {
        let next = self.now().wrapping_add(ticks) & self.mask;
        self.now.store(next, Ordering::SeqCst);
    }

    /// Counter width mask
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl Default for SimClock {
    fn default() -> Self {
        SimClock::new(SimConfig::default().counter_mask)
    }
}

/// Characteristics of the simulated peripheral
///
/// Defaults describe a 24-bit RTC running at 32768 Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    pub min_timeout_ticks: u32,
    pub max_timeout_ticks: u32,
    pub counter_mask: u32,
    pub frequency_hz: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            min_timeout_ticks: 5,
            max_timeout_ticks: 0x00FF_FFFF,
            counter_mask: 0x00FF_FFFF,
            frequency_hz: 32_768,
        }
    }
}

#[derive(Debug, Default)]
struct SimSlot {
    created: bool,
    /// Ticks until expiry of the pending arm
    pending: Option<u32>,
    arms: Vec<u32>,
    fail_next_start: bool,
}

/// Simulated single-shot timer slot
///
/// Clones share the same slot, so a test can keep a probe while the
/// original is owned by a [`LogicalTimer`].
#[derive(Debug, Clone)]
pub struct SimHardwareTimer {
    clock: SimClock,
    config: SimConfig,
    slot: Arc<Mutex<SimSlot>>,
}

impl SimHardwareTimer {
    /// Creates a slot with the default characteristics
    pub fn new(clock: SimClock) -> Self {
        SimHardwareTimer::with_config(clock, SimConfig::default())
    }

    /// Creates a slot with custom characteristics
    pub fn with_config(clock: SimClock, config: SimConfig) -> Self {
        SimHardwareTimer {
            clock,
            config,
            slot: Arc::new(Mutex::new(SimSlot::default())),
        }
    }

    fn slot(&self) -> MutexGuard<'_, SimSlot> {
        self.slot.lock().expect("sim timer slot mutex poisoned")
    }

    /// Shared clock
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Whether `create_single_shot` has been called
    pub fn is_created(&self) -> bool {
        self.slot().created
    }

    /// Ticks until the pending expiry, if armed
    pub fn pending(&self) -> Option<u32> {
        self.slot().pending
    }

    /// Every successful arm so far, in order
    pub fn arms(&self) -> Vec<u32> {
        self.slot().arms.clone()
    }

    /// Makes the next `start` fail
    pub fn fail_next_start(&self) {
        self.slot().fail_next_start = true;
    }

    /// Moves time forward without reaching the pending expiry
    ///
    /// Returns `false` (and does nothing) if `ticks` would reach or pass the
    /// expiry.
    pub fn advance(&self, ticks: u32) -> bool {
        let mut slot = self.slot();
        let pending = slot.pending;
        match pending {
            Some(pending) if ticks >= pending => false,
            _ => {
                slot.pending = pending.map(|p| p - ticks);
                self.clock.advance(ticks);
                true
            }
        }
    }

    /// Moves the clock to the pending expiry and disarms the slot
    ///
    /// Returns `false` if nothing was armed.
    pub fn advance_to_expiry(&self) -> bool {
        let pending = self.slot().pending.take();
        match pending {
            Some(ticks) => {
                self.clock.advance(ticks);
                true
            }
            None => false,
        }
    }
}

impl HardwareTimer for SimHardwareTimer {
    fn create_single_shot(&mut self) -> Result<()> {
        self.slot().created = true;
        Ok(())
    }

    fn start(&mut self, ticks: u32) -> Result<()> {
        let mut slot = self.slot();
        if !slot.created {
            return Err(Error::hardware("slot started before creation"));
        }
        if std::mem::take(&mut slot.fail_next_start) {
            return Err(Error::hardware("injected start failure"));
        }
        if slot.pending.is_some() {
            return Err(Error::hardware("slot already armed"));
        }
        if ticks < self.config.min_timeout_ticks || ticks > self.config.max_timeout_ticks {
            return Err(Error::hardware(format!("timeout of {} ticks out of range", ticks)));
        }

        slot.pending = Some(ticks);
        slot.arms.push(ticks);
        Ok(())
    }

    fn stop(&mut self) {
        self.slot().pending = None;
    }

    fn counter(&self) -> u32 {
        self.clock.now()
    }

    fn min_timeout_ticks(&self) -> u32 {
        self.config.min_timeout_ticks
    }

    fn max_timeout_ticks(&self) -> u32 {
        self.config.max_timeout_ticks
    }

    fn counter_mask(&self) -> u32 {
        self.config.counter_mask
    }

    fn frequency_hz(&self) -> u32 {
        self.config.frequency_hz
    }
}

/// Runs the timer's slot to its pending expiry and dispatches the timer
///
/// Returns `false` if the slot was idle.
pub fn fire_next<C>(timer: &mut LogicalTimer<SimHardwareTimer, C>) -> bool {
    if timer.hardware().advance_to_expiry() {
        timer.dispatch();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_wraps_at_mask() {
        let clock = SimClock::starting_at(0xFF, 0xF0);
        clock.advance(0x20);
        assert_eq!(clock.now(), 0x10);
    }

    #[test]
    fn test_slot_rejects_double_arm() {
        let mut hw = SimHardwareTimer::new(SimClock::default());
        assert!(hw.start(10).is_err());
        hw.create_single_shot().unwrap();
        hw.start(10).unwrap();
        assert!(hw.start(10).is_err());
        hw.stop();
        hw.start(20).unwrap();
        assert_eq!(hw.arms(), vec![10, 20]);
    }

    #[test]
    fn test_slot_rejects_out_of_range() {
        let mut hw = SimHardwareTimer::new(SimClock::default());
        hw.create_single_shot().unwrap();
        assert!(hw.start(4).is_err());
        assert!(hw.start(0x0100_0000).is_err());
    }

    #[test]
    fn test_advance_to_expiry() {
        let mut hw = SimHardwareTimer::new(SimClock::default());
        let probe = hw.clone();
        hw.create_single_shot().unwrap();
        hw.start(100).unwrap();

        assert!(probe.advance(40));
        assert_eq!(probe.pending(), Some(60));
        assert!(!probe.advance(60));
        assert!(probe.advance_to_expiry());
        assert_eq!(hw.counter(), 100);
        assert!(!probe.advance_to_expiry());
    }
}
