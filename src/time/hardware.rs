use crate::core::Result;

/// Single-shot hardware timer slot driving one [`LogicalTimer`]
///
/// Implementations wrap a peripheral such as an RTC compare channel. The
/// slot does not call back into the logical timer itself: whatever handles
/// the expiry interrupt must call [`LogicalTimer::dispatch`] on the owning
/// timer.
///
/// [`LogicalTimer`]: super::LogicalTimer
/// [`LogicalTimer::dispatch`]: super::LogicalTimer::dispatch
pub trait HardwareTimer {
    /// Configures the slot for single-shot operation
    fn create_single_shot(&mut self) -> Result<()>;

    /// Arms the slot to expire `ticks` ticks from now
    ///
    /// Must reject `ticks` outside `min_timeout_ticks()..=max_timeout_ticks()`.
    fn start(&mut self, ticks: u32) -> Result<()>;

    /// Cancels a pending expiry. Stopping an idle slot is a no-op.
    fn stop(&mut self);

    /// Current value of the free running counter
    fn counter(&self) -> u32;

    /// Smallest timeout the slot can be armed with
    fn min_timeout_ticks(&self) -> u32;

    /// Largest timeout the slot can be armed with in a single arm-cycle
    fn max_timeout_ticks(&self) -> u32;

    /// Mask of the significant counter bits
    fn counter_mask(&self) -> u32;

    /// Counter frequency
    fn frequency_hz(&self) -> u32;

    /// Ticks from `then` to `now`, accounting for one counter wraparound
    fn counter_diff(&self, now: u32, then: u32) -> u32 {
        now.wrapping_sub(then) & self.counter_mask()
    }
}
