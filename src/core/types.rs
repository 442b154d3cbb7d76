use serde::{Deserialize, Serialize};

/// Unicast, group or virtual address of a mesh element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub u16);

impl Address {
    /// Returns the raw address value
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Address(value)
    }
}

/// The subset of a received message's metadata needed for deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageMeta {
    /// Source address
    pub src: Address,
    /// Destination address
    pub dst: Address,
}

impl MessageMeta {
    /// Creates message metadata from raw source and destination addresses
    pub fn new(src: u16, dst: u16) -> Self {
        MessageMeta {
            src: Address(src),
            dst: Address(dst),
        }
    }
}

/// Identifier of an entry in the persistent configuration store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId {
    /// File the entry belongs to
    pub file: u16,
    /// Record within the file
    pub record: u16,
}

impl EntryId {
    /// Creates a new entry identifier
    pub const fn new(file: u16, record: u16) -> Self {
        EntryId { file, record }
    }
}

/// Maximum number of setup server instances compiled in per model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceLimits {
    /// Light Lightness Setup Server instances
    pub light_lightness: u16,
    /// Light LC Setup Server instances
    pub light_lc: u16,
    /// Light CTL Setup Server instances
    pub light_ctl: u16,
}

impl Default for InstanceLimits {
    fn default() -> Self {
        InstanceLimits {
            light_lightness: 1,
            light_lc: 1,
            light_ctl: 1,
        }
    }
}

/// Persisted model metadata record
///
/// Encoded with bincode's default fixed-width little endian layout, which
/// gives exactly three 16-bit counts back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub light_lightness_instance_count: u16,
    pub light_lc_instance_count: u16,
    pub light_ctl_instance_count: u16,
}

impl ModelMetadata {
    /// Size of the encoded record in bytes
    pub const ENCODED_LEN: usize = 6;

    /// Returns whether the record describes exactly the given limits
    pub fn matches(&self, limits: &InstanceLimits) -> bool {
        *self == ModelMetadata::from(*limits)
    }
}

impl From<InstanceLimits> for ModelMetadata {
    fn from(limits: InstanceLimits) -> Self {
        ModelMetadata {
            light_lightness_instance_count: limits.light_lightness,
            light_lc_instance_count: limits.light_lc,
            light_ctl_instance_count: limits.light_ctl,
        }
    }
}
