use std::fmt;

use tracing::{debug, error, trace};

use crate::core::{Error, Result};
use super::hardware::HardwareTimer;

/// Timer firing behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    /// Fire once, then go idle
    #[default]
    OneShot,
    /// Fire every `timeout` ticks until aborted
    Repeating,
}

/// What a callback wants done with its binding after it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Stay bound
    Keep,
    /// Unbind the callback. A repeating timer stops repeating.
    Release,
}

/// Callback invoked when the full logical timeout has elapsed
///
/// The callback receives the timer's control block and may call
/// [`TimerControl::schedule`] or [`TimerControl::abort`] on it.
pub type TimerCallback<H, C> = fn(&mut TimerControl<H>, &mut C) -> Binding;

/// Bookkeeping and hardware slot of a [`LogicalTimer`]
#[derive(Debug)]
pub struct TimerControl<H> {
    hw: H,
    mode: TimerMode,
    /// Full requested duration
    configured_ticks: u64,
    /// Ticks left before the next logical firing, not counting the armed chunk
    remaining_ticks: u64,
    /// Ticks consumed since the last `schedule`
    elapsed_ticks: u64,
    last_clock_sample: u32,
    armed: bool,
    callback_running: bool,
}

impl<H: HardwareTimer> TimerControl<H> {
    fn new(hw: H, mode: TimerMode) -> Self {
        TimerControl {
            hw,
            mode,
            configured_ticks: 0,
            remaining_ticks: 0,
            elapsed_ticks: 0,
            last_clock_sample: 0,
            armed: false,
            callback_running: false,
        }
    }

    /// Returns the firing mode
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Sets the firing mode; takes effect at the next firing
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
    }

    /// Returns the configured timeout in ticks
    pub fn timeout_ticks(&self) -> u64 {
        self.configured_ticks
    }

    /// Sets the timeout used by the next `schedule`
    ///
    /// A running chain keeps its current deadline. A repeating timer picks
    /// the new value up when it reloads after a firing.
    pub fn set_timeout_ticks(&mut self, ticks: u64) {
        self.configured_ticks = ticks;
    }

    /// Sets the timeout in milliseconds
    pub fn set_timeout_ms(&mut self, ms: u32) {
        let ticks = super::ms_to_ticks(ms, self.hw.frequency_hz());
        self.set_timeout_ticks(ticks);
    }

    /// Ticks elapsed since the last `schedule`, including earlier repeats
    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    /// Ticks still to be armed before the next firing
    pub fn remaining_ticks(&self) -> u64 {
        self.remaining_ticks
    }

    /// Whether the hardware slot holds a pending expiry
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Whether the bound callback is executing right now
    pub fn is_callback_running(&self) -> bool {
        self.callback_running
    }

    /// Hardware slot
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Mutable hardware slot
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Restarts the timeout from zero
    ///
    /// From inside the callback the slot is not armed here; dispatch arms it
    /// once the callback has returned.
    pub fn schedule(&mut self) -> Result<()> {
        let min = self.hw.min_timeout_ticks();
        if self.configured_ticks == 0 || self.configured_ticks < u64::from(min) {
            return Err(Error::invalid_duration(self.configured_ticks, min));
        }

        self.stop_hardware();
        self.remaining_ticks = self.configured_ticks;
        self.last_clock_sample = self.hw.counter();
        self.elapsed_ticks = 0;

        if self.callback_running {
            trace!(ticks = self.configured_ticks, "schedule from callback, arming deferred");
            return Ok(());
        }

        debug!(ticks = self.configured_ticks, mode = ?self.mode, "timer scheduled");
        self.arm_next()
    }

    /// Stops the timer and forgets the configured timeout
    pub fn abort(&mut self) {
        self.stop_hardware();
        self.remaining_ticks = 0;
        self.configured_ticks = 0;
        self.elapsed_ticks = 0;
        trace!("timer aborted");
    }

    fn stop_hardware(&mut self) {
        self.hw.stop();
        self.armed = false;
    }

    /// Arms the next chunk of the remaining timeout
    ///
    /// A chunk never leaves behind a remainder the hardware could not be
    /// armed with.
    fn arm_next(&mut self) -> Result<()> {
        let min = u64::from(self.hw.min_timeout_ticks());
        let cap = u64::from(self.hw.max_timeout_ticks());
        let remaining = self.remaining_ticks;

        let chunk = if remaining <= cap {
            remaining
        } else if remaining - cap >= min {
            cap
        } else {
            remaining - min
        };

        // chunk <= cap, which came from a u32
        let chunk32 = chunk as u32;
        if let Err(e) = self.hw.start(chunk32) {
            self.remaining_ticks = 0;
            return Err(e);
        }

        self.remaining_ticks -= chunk;
        self.armed = true;
        trace!(chunk, remaining = self.remaining_ticks, "hardware slot armed");
        Ok(())
    }

    /// Starts the next period of a repeating timer
    fn reload(&mut self) {
        let min = self.hw.min_timeout_ticks();
        if self.configured_ticks != 0 && self.configured_ticks < u64::from(min) {
            error!(
                "repeating timer stopped: {}",
                Error::invalid_duration(self.configured_ticks, min)
            );
            return;
        }
        self.remaining_ticks = self.configured_ticks;
    }

    fn account_elapsed(&mut self) {
        let now = self.hw.counter();
        let delta = self.hw.counter_diff(now, self.last_clock_sample);
        self.elapsed_ticks += u64::from(delta);
        self.last_clock_sample = now;
    }
}

/// Timeout of arbitrary length built on a single-shot hardware timer
///
/// Durations longer than the hardware can represent are split into several
/// arm-cycles; the callback fires once the whole duration has elapsed.
///
/// # Examples
///
/// ```
/// use mesh_model_common::time::sim::{fire_next, SimClock, SimHardwareTimer};
/// use mesh_model_common::time::{Binding, LogicalTimer, TimerControl, TimerMode};
///
/// fn on_timeout(_: &mut TimerControl<SimHardwareTimer>, fired: &mut u32) -> Binding {
///     *fired += 1;
///     Binding::Keep
/// }
///
/// let hw = SimHardwareTimer::new(SimClock::default());
/// let mut timer = LogicalTimer::new(hw, TimerMode::OneShot, 0u32);
/// timer.bind(on_timeout);
/// timer.create().unwrap();
/// timer.set_timeout_ticks(3 * 0x00FF_FFFF);
/// timer.schedule().unwrap();
///
/// while fire_next(&mut timer) {}
/// assert_eq!(*timer.context(), 1);
/// assert_eq!(timer.elapsed_ticks(), 3 * 0x00FF_FFFF);
/// ```
pub struct LogicalTimer<H, C = ()> {
    control: TimerControl<H>,
    callback: Option<TimerCallback<H, C>>,
    context: C,
}

impl<H: fmt::Debug, C> fmt::Debug for LogicalTimer<H, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalTimer")
            .field("control", &self.control)
            .field("bound", &self.callback.is_some())
            .finish()
    }
}

impl<H: HardwareTimer, C> LogicalTimer<H, C> {
    /// Creates an unbound, idle timer owning `hw`
    pub fn new(hw: H, mode: TimerMode, context: C) -> Self {
        LogicalTimer {
            control: TimerControl::new(hw, mode),
            callback: None,
            context,
        }
    }

    /// Binds the callback invoked on expiry
    pub fn bind(&mut self, callback: TimerCallback<H, C>) {
        self.callback = Some(callback);
    }

    /// Unbinds the callback; a pending expiry will not invoke anything
    pub fn unbind(&mut self) {
        self.callback = None;
    }

    /// Whether a callback is bound
    pub fn is_bound(&self) -> bool {
        self.callback.is_some()
    }

    /// Sets up the hardware slot in single-shot mode
    pub fn create(&mut self) -> Result<()> {
        if self.callback.is_none() {
            return Err(Error::NullBinding);
        }

        self.control.callback_running = false;
        self.control.hw.create_single_shot()
    }

    /// Starts (or restarts) the configured timeout
    pub fn schedule(&mut self) -> Result<()> {
        if self.callback.is_none() {
            return Err(Error::NullBinding);
        }

        self.control.schedule()
    }

    /// Stops the timer; it stays idle until the next `schedule`
    pub fn abort(&mut self) {
        self.control.abort();
    }

    /// Handles an expiry of the hardware slot
    ///
    /// # Panics
    ///
    /// Panics if no callback is bound. A timer without a callback is never
    /// armed by `schedule`, so this only happens when the owner routes an
    /// expiry to the wrong timer.
    pub fn dispatch(&mut self) {
        let callback = match self.callback {
            Some(callback) => callback,
            None => panic!("timer dispatched without a bound callback"),
        };

        let control = &mut self.control;
        control.armed = false;
        control.account_elapsed();

        if control.remaining_ticks == 0 {
            debug!(elapsed = control.elapsed_ticks, "timer fired");
            control.callback_running = true;
            let binding = callback(control, &mut self.context);
            control.callback_running = false;

            match binding {
                Binding::Keep => {
                    if control.mode == TimerMode::Repeating {
                        control.reload();
                    }
                }
                Binding::Release => {
                    self.callback = None;
                    control.stop_hardware();
                    control.remaining_ticks = 0;
                }
            }
        }

        if control.remaining_ticks > 0 {
            if let Err(e) = control.arm_next() {
                error!("failed to re-arm hardware slot: {}", e);
            }
        }
    }

    /// Returns the firing mode
    pub fn mode(&self) -> TimerMode {
        self.control.mode()
    }

    /// Sets the firing mode
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.control.set_mode(mode);
    }

    /// Returns the configured timeout in ticks
    pub fn timeout_ticks(&self) -> u64 {
        self.control.timeout_ticks()
    }

    /// Sets the timeout used by the next `schedule`
    pub fn set_timeout_ticks(&mut self, ticks: u64) {
        self.control.set_timeout_ticks(ticks);
    }

    /// Sets the timeout in milliseconds
    pub fn set_timeout_ms(&mut self, ms: u32) {
        self.control.set_timeout_ms(ms);
    }

    /// Ticks elapsed since the last `schedule`, including earlier repeats
    pub fn elapsed_ticks(&self) -> u64 {
        self.control.elapsed_ticks()
    }

    /// Ticks still to be armed before the next firing
    pub fn remaining_ticks(&self) -> u64 {
        self.control.remaining_ticks()
    }

    /// Whether the hardware slot holds a pending expiry
    pub fn is_armed(&self) -> bool {
        self.control.is_armed()
    }

    /// Hardware slot
    pub fn hardware(&self) -> &H {
        self.control.hardware()
    }

    /// Mutable hardware slot
    pub fn hardware_mut(&mut self) -> &mut H {
        self.control.hardware_mut()
    }

    /// Callback context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable callback context
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }
}
