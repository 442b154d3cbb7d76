//! Mesh model common: shared building blocks for mesh model implementations
//!
//! This library provides what every model server on a constrained mesh node
//! needs besides its own state machine: timers that outlast the hardware
//! timer's range, transaction deduplication, the transition time and delay
//! wire codec, and the persistent metadata that guards stored model state.
pub mod core;
pub mod protocol;
pub mod storage;
pub mod time;

// Re-export commonly used items
pub use crate::core::{Error, Result};
pub use crate::protocol::TransactionTracker;
pub use crate::storage::ModelCommon;
pub use crate::time::{HardwareTimer, LogicalTimer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
