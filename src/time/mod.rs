//! Model timers
//!
//! Application level timeouts on constrained platforms are often far longer
//! than a single hardware timer arm-cycle can represent. This module provides:
//!
//! - [`HardwareTimer`]: the minimal single-shot peripheral interface
//! - [`LogicalTimer`]: an arbitrarily long, optionally repeating timeout that
//!   chains as many arm-cycles as needed and keeps an exact elapsed tick count
//! - [`sim`]: a simulated peripheral for driving timers in tests
//!
//! # Examples
//!
//! ```
//! use mesh_model_common::time::sim::{fire_next, SimClock, SimHardwareTimer};
//! use mesh_model_common::time::{Binding, LogicalTimer, TimerControl, TimerMode};
//!
//! fn blink(timer: &mut TimerControl<SimHardwareTimer>, count: &mut u32) -> Binding {
//!     *count += 1;
//!     if *count == 3 {
//!         timer.abort();
//!     }
//!     Binding::Keep
//! }
//!
//! let hw = SimHardwareTimer::new(SimClock::default());
//! let mut timer = LogicalTimer::new(hw, TimerMode::Repeating, 0u32);
//! timer.bind(blink);
//! timer.create().unwrap();
//! timer.set_timeout_ms(10 * 60 * 1000);
//! timer.schedule().unwrap();
//!
//! while fire_next(&mut timer) {}
//! assert_eq!(*timer.context(), 3);
//! ```

mod hardware;
pub mod sim;
mod timer;

pub use self::hardware::HardwareTimer;
pub use self::timer::{Binding, LogicalTimer, TimerCallback, TimerControl, TimerMode};

/// Converts milliseconds to ticks of a `frequency_hz` counter, rounding to
/// the nearest tick
pub fn ms_to_ticks(ms: u32, frequency_hz: u32) -> u64 {
    (u64::from(ms) * u64::from(frequency_hz) + 500) / 1000
}

/// Converts ticks of a `frequency_hz` counter to whole milliseconds
pub fn ticks_to_ms(ticks: u64, frequency_hz: u32) -> u64 {
    if frequency_hz == 0 {
        return 0;
    }
    ticks.saturating_mul(1000) / u64::from(frequency_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_ticks() {
        assert_eq!(ms_to_ticks(1000, 32_768), 32_768);
        assert_eq!(ms_to_ticks(6000, 32_768), 196_608);
        // 1 ms is 32.768 ticks
        assert_eq!(ms_to_ticks(1, 32_768), 33);
        assert_eq!(ms_to_ticks(0, 32_768), 0);
    }

    #[test]
    fn test_ticks_to_ms() {
        assert_eq!(ticks_to_ms(32_768, 32_768), 1000);
        assert_eq!(ticks_to_ms(33, 32_768), 1);
        assert_eq!(ticks_to_ms(32, 32_768), 0);
        assert_eq!(ticks_to_ms(100, 0), 0);
    }

    #[test]
    fn test_conversion_is_stable_for_whole_seconds() {
        for secs in 0..100u32 {
            let ticks = ms_to_ticks(secs * 1000, 32_768);
            assert_eq!(ticks_to_ms(ticks, 32_768), u64::from(secs) * 1000);
        }
    }
}
