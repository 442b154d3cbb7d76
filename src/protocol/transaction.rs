use tracing::{trace, warn};

use crate::core::{Address, MessageMeta, Result, TID_VALIDATION_INTERVAL_MS};
use crate::time::{Binding, HardwareTimer, LogicalTimer, TimerControl, TimerMode};

/// Identity of the last accepted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionKey {
    /// Source address
    pub src: Address,
    /// Destination address
    pub dst: Address,
    /// Transport level message identifier
    pub message_id: u32,
    /// Transaction identifier
    pub tid: u8,
}

/// Tells retransmissions of a transaction apart from new transactions
///
/// A message starts a new transaction unless it repeats the source,
/// destination, message id and TID of the last accepted one within
/// [`TID_VALIDATION_INTERVAL_MS`] of its arrival. The window is kept by a
/// one-shot [`LogicalTimer`] whose callback unbinds itself when it fires;
/// a bound callback means the window is open.
#[derive(Debug)]
pub struct TransactionTracker<H> {
    last: Option<TransactionKey>,
    expiry_timer: LogicalTimer<H>,
    new_transaction: bool,
}

fn close_window<H>(_: &mut TimerControl<H>, _: &mut ()) -> Binding {
    Binding::Release
}

impl<H: HardwareTimer> TransactionTracker<H> {
    /// Creates a tracker owning `hw` for its validity window
    pub fn new(hw: H) -> Result<Self> {
        let mut expiry_timer = LogicalTimer::new(hw, TimerMode::OneShot, ());
        expiry_timer.bind(close_window::<H>);
        expiry_timer.create()?;
        expiry_timer.unbind();
        expiry_timer.set_timeout_ms(TID_VALIDATION_INTERVAL_MS);

        Ok(TransactionTracker {
            last: None,
            expiry_timer,
            new_transaction: false,
        })
    }

    /// Classifies a received message, returning whether it is new
    pub fn validate(&mut self, meta: &MessageMeta, message_id: u32, tid: u8) -> bool {
        let key = TransactionKey {
            src: meta.src,
            dst: meta.dst,
            message_id,
            tid,
        };

        let is_new = !self.expiry_timer.is_bound() || self.last != Some(key);
        if is_new {
            self.last = Some(key);
            self.open_window();
            trace!(src = key.src.0, dst = key.dst.0, tid, "new transaction");
        } else {
            trace!(src = key.src.0, dst = key.dst.0, tid, "retransmitted transaction");
        }

        self.new_transaction = is_new;
        is_new
    }

    fn open_window(&mut self) {
        self.expiry_timer.bind(close_window::<H>);
        self.expiry_timer.set_timeout_ms(TID_VALIDATION_INTERVAL_MS);
        if let Err(e) = self.expiry_timer.schedule() {
            // Without a running window the next message counts as new.
            warn!("failed to start transaction window: {}", e);
            self.expiry_timer.unbind();
        }
    }

    /// Result of the last `validate`
    pub fn is_new(&self) -> bool {
        self.new_transaction
    }

    /// Whether a validity window is running
    pub fn is_window_open(&self) -> bool {
        self.expiry_timer.is_bound()
    }

    /// The transaction the window refers to
    pub fn last_transaction(&self) -> Option<&TransactionKey> {
        self.last.as_ref()
    }

    /// Handles an expiry of the window's hardware slot
    pub fn on_timer_expiry(&mut self) {
        self.expiry_timer.dispatch();
    }

    /// The window timer
    pub fn expiry_timer(&self) -> &LogicalTimer<H> {
        &self.expiry_timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::sim::{SimClock, SimConfig, SimHardwareTimer};

    const WINDOW_TICKS: u32 = 6 * 32_768;

    fn tracker() -> TransactionTracker<SimHardwareTimer> {
        TransactionTracker::new(SimHardwareTimer::new(SimClock::default())).unwrap()
    }

    fn expire(tracker: &mut TransactionTracker<SimHardwareTimer>) {
        while tracker.expiry_timer().hardware().advance_to_expiry() {
            tracker.on_timer_expiry();
        }
    }

    #[test]
    fn test_new_duplicate_then_new_after_window() {
        let mut tracker = tracker();
        let meta = MessageMeta::new(0x10, 0x20);

        assert!(tracker.validate(&meta, 5, 3));
        assert!(tracker.is_window_open());
        assert_eq!(tracker.expiry_timer().hardware().arms(), vec![WINDOW_TICKS]);

        assert!(!tracker.validate(&meta, 5, 3));
        assert!(!tracker.is_new());

        expire(&mut tracker);
        assert!(!tracker.is_window_open());
        assert!(tracker.validate(&meta, 5, 3));
        assert!(tracker.is_new());
    }

    #[test]
    fn test_any_field_change_is_new() {
        let mut tracker = tracker();
        let meta = MessageMeta::new(0x10, 0x20);
        assert!(tracker.validate(&meta, 5, 3));

        assert!(tracker.validate(&MessageMeta::new(0x11, 0x20), 5, 3));
        assert!(tracker.validate(&MessageMeta::new(0x11, 0x21), 5, 3));
        assert!(tracker.validate(&MessageMeta::new(0x11, 0x21), 6, 3));
        assert!(tracker.validate(&MessageMeta::new(0x11, 0x21), 6, 4));
        assert!(!tracker.validate(&MessageMeta::new(0x11, 0x21), 6, 4));

        let last = tracker.last_transaction().unwrap();
        assert_eq!(last.src, Address(0x11));
        assert_eq!(last.message_id, 6);
        assert_eq!(last.tid, 4);
    }

    #[test]
    fn test_duplicate_does_not_extend_window() {
        let mut tracker = tracker();
        let meta = MessageMeta::new(0x01, 0x02);
        assert!(tracker.validate(&meta, 1, 1));

        let hw = tracker.expiry_timer().hardware().clone();
        assert!(hw.advance(5 * 32_768));
        assert!(!tracker.validate(&meta, 1, 1));
        assert_eq!(hw.pending(), Some(32_768));

        expire(&mut tracker);
        assert_eq!(hw.clock().now(), WINDOW_TICKS);
        assert!(tracker.validate(&meta, 1, 1));
    }

    #[test]
    fn test_new_transaction_restarts_window() {
        let mut tracker = tracker();
        assert!(tracker.validate(&MessageMeta::new(0x01, 0x02), 1, 1));

        let hw = tracker.expiry_timer().hardware().clone();
        assert!(hw.advance(32_768));
        assert!(tracker.validate(&MessageMeta::new(0x01, 0x02), 1, 2));
        assert_eq!(hw.pending(), Some(WINDOW_TICKS));
    }

    #[test]
    fn test_window_spanning_several_arms() {
        let config = SimConfig {
            max_timeout_ticks: 50_000,
            ..SimConfig::default()
        };
        let hw = SimHardwareTimer::with_config(SimClock::default(), config);
        let mut tracker = TransactionTracker::new(hw).unwrap();
        let meta = MessageMeta::new(0x10, 0x20);
        assert!(tracker.validate(&meta, 5, 3));

        for _ in 0..3 {
            assert!(tracker.expiry_timer().hardware().advance_to_expiry());
            tracker.on_timer_expiry();
            assert!(tracker.is_window_open());
            assert!(!tracker.validate(&meta, 5, 3));
        }

        expire(&mut tracker);
        assert_eq!(tracker.expiry_timer().elapsed_ticks(), u64::from(WINDOW_TICKS));
        assert!(tracker.validate(&meta, 5, 3));
    }

    #[test]
    fn test_failed_window_start_keeps_window_closed() {
        let mut tracker = tracker();
        let meta = MessageMeta::new(0x10, 0x20);
        tracker.expiry_timer().hardware().fail_next_start();

        assert!(tracker.validate(&meta, 5, 3));
        assert!(!tracker.is_window_open());
        assert!(tracker.validate(&meta, 5, 3));
        assert!(tracker.is_window_open());
    }
}
