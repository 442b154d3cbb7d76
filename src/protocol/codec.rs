use bytes::{Buf, BufMut};

use crate::core::{Error, Result};

/// Step count reserved for "unknown transition time"
pub const TRANSITION_TIME_UNKNOWN: u8 = 0x3F;

/// Bits of an encoded transition time selecting the step resolution
pub const TRANSITION_TIME_STEP_MASK: u8 = 0xC0;

/// Largest usable step count, one below the reserved pattern
pub const TRANSITION_TIME_MAX_STEPS: u32 = 0x3E;

/// Longest transition time that can be encoded
pub const TRANSITION_TIME_MAX_MS: u32 =
    TRANSITION_TIME_MAX_STEPS * StepResolution::TenMinutes.factor_ms();

/// Milliseconds per delay step
pub const DELAY_TIME_STEP_FACTOR_MS: u32 = 5;

/// Largest encoded delay
pub const DELAY_TIME_STEP_MAX: u8 = 0xFF;

/// Longest delay that can be encoded
pub const DELAY_TIME_MAX_MS: u32 = DELAY_TIME_STEP_MAX as u32 * DELAY_TIME_STEP_FACTOR_MS;

/// Resolution of the steps in an encoded transition time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResolution {
    HundredMillis,
    OneSecond,
    TenSeconds,
    TenMinutes,
}

impl StepResolution {
    /// Resolutions from finest to coarsest
    pub const ALL: [StepResolution; 4] = [
        StepResolution::HundredMillis,
        StepResolution::OneSecond,
        StepResolution::TenSeconds,
        StepResolution::TenMinutes,
    ];

    /// Selects the resolution from the top two bits of an encoded value
    pub fn from_encoded(encoded: u8) -> Self {
        match encoded & TRANSITION_TIME_STEP_MASK {
            0x00 => StepResolution::HundredMillis,
            0x40 => StepResolution::OneSecond,
            0x80 => StepResolution::TenSeconds,
            _ => StepResolution::TenMinutes,
        }
    }

    /// Resolution bits as placed in the encoded value
    pub const fn bits(self) -> u8 {
        match self {
            StepResolution::HundredMillis => 0x00,
            StepResolution::OneSecond => 0x40,
            StepResolution::TenSeconds => 0x80,
            StepResolution::TenMinutes => 0xC0,
        }
    }

    /// Length of one step
    pub const fn factor_ms(self) -> u32 {
        match self {
            StepResolution::HundredMillis => 100,
            StepResolution::OneSecond => 1_000,
            StepResolution::TenSeconds => 10_000,
            StepResolution::TenMinutes => 600_000,
        }
    }

    /// Longest time representable at this resolution
    pub const fn max_ms(self) -> u32 {
        TRANSITION_TIME_MAX_STEPS * self.factor_ms()
    }
}

/// Decodes a transition time to milliseconds; `None` if unknown
pub fn decode_transition_time(encoded: u8) -> Option<u32> {
    let steps = encoded & !TRANSITION_TIME_STEP_MASK;
    if steps == TRANSITION_TIME_UNKNOWN {
        return None;
    }

    Some(u32::from(steps) * StepResolution::from_encoded(encoded).factor_ms())
}

/// Encodes a transition time at the finest resolution that can hold it
///
/// Steps are truncated, so the encoding is lossy: 1550 ms encodes as 15
/// steps of 100 ms and decodes back to 1500 ms. Times above
/// [`TRANSITION_TIME_MAX_MS`] encode as [`TRANSITION_TIME_UNKNOWN`].
pub fn encode_transition_time(ms: u32) -> u8 {
    StepResolution::ALL
        .iter()
        .find(|resolution| ms <= resolution.max_ms())
        .map(|resolution| (ms / resolution.factor_ms()) as u8 | resolution.bits())
        .unwrap_or(TRANSITION_TIME_UNKNOWN)
}

/// Whether an encoded transition time carries a known value
pub fn is_transition_time_valid(encoded: u8) -> bool {
    encoded & !TRANSITION_TIME_STEP_MASK != TRANSITION_TIME_UNKNOWN
}

/// Decodes a message execution delay to milliseconds
pub fn decode_delay(encoded: u8) -> u32 {
    u32::from(encoded) * DELAY_TIME_STEP_FACTOR_MS
}

/// Encodes a message execution delay, saturating at [`DELAY_TIME_MAX_MS`]
pub fn encode_delay(ms: u32) -> u8 {
    (ms.min(DELAY_TIME_MAX_MS) / DELAY_TIME_STEP_FACTOR_MS) as u8
}

/// Optional transition time and delay trailer of model set messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionParams {
    /// Encoded transition time
    pub transition_time: u8,
    /// Encoded delay
    pub delay: u8,
}

impl TransitionParams {
    /// Size of the trailer on the wire
    pub const ENCODED_LEN: usize = 2;

    /// Encodes the given durations
    pub fn from_ms(transition_time_ms: u32, delay_ms: u32) -> Self {
        TransitionParams {
            transition_time: encode_transition_time(transition_time_ms),
            delay: encode_delay(delay_ms),
        }
    }

    /// Transition time in milliseconds, `None` if unknown
    pub fn transition_time_ms(&self) -> Option<u32> {
        decode_transition_time(self.transition_time)
    }

    /// Delay in milliseconds
    pub fn delay_ms(&self) -> u32 {
        decode_delay(self.delay)
    }

    /// Appends the trailer to a message
    pub fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(self.transition_time);
        dst.put_u8(self.delay);
    }

    /// Reads the trailer from what is left of a message
    ///
    /// An absent trailer decodes as `None`. Anything but zero or two
    /// remaining bytes, or an unknown transition time, is rejected.
    pub fn decode<B: Buf>(src: &mut B) -> Result<Option<Self>> {
        match src.remaining() {
            0 => Ok(None),
            Self::ENCODED_LEN => {
                let transition_time = src.get_u8();
                let delay = src.get_u8();
                if !is_transition_time_valid(transition_time) {
                    return Err(Error::protocol(format!(
                        "prohibited transition time 0x{:02x}",
                        transition_time
                    )));
                }
                Ok(Some(TransitionParams { transition_time, delay }))
            }
            n => Err(Error::protocol(format!(
                "transition trailer must be {} bytes, got {}",
                Self::ENCODED_LEN,
                n
            ))),
        }
    }
}
