//! Core types shared by the model common layer
//!
//! This module contains the error type, the value types exchanged with the
//! mesh stack and the protocol constants used throughout the library.

pub mod error;
pub mod types;

pub use self::error::{Error, Result};
pub use self::types::{Address, EntryId, InstanceLimits, MessageMeta, ModelMetadata};

/// Window during which a repeated transaction identifier refers to the same
/// transaction (Mesh Model specification, 6 seconds)
pub const TID_VALIDATION_INTERVAL_MS: u32 = 6_000;

/// Persistent storage file holding model state
pub const MODEL_FILE_ID: u16 = 0x0003;

/// Record of the model common metadata within [`MODEL_FILE_ID`]
pub const MODEL_COMMON_RECORD_ID: u16 = 0x0001;

/// Entry under which the model common metadata is persisted
pub const MODEL_COMMON_METADATA_EID: EntryId = EntryId::new(MODEL_FILE_ID, MODEL_COMMON_RECORD_ID);
