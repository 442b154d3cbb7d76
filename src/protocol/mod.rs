//! Model message helpers
//!
//! This module holds what model message handlers share: the transition time
//! and delay wire codec, and the transaction tracker that tells a
//! retransmitted message apart from a new one.

pub mod codec;
pub mod transaction;

pub use self::codec::{
    decode_delay, decode_transition_time, encode_delay, encode_transition_time,
    is_transition_time_valid, StepResolution, TransitionParams, DELAY_TIME_MAX_MS,
    DELAY_TIME_STEP_FACTOR_MS, DELAY_TIME_STEP_MAX, TRANSITION_TIME_MAX_MS,
    TRANSITION_TIME_UNKNOWN,
};
pub use self::transaction::{TransactionKey, TransactionTracker};
