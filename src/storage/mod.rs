//! Persistent model metadata
//!
//! Models that keep state in the persistent configuration store record the
//! instance counts they were built with. When the stored counts no longer
//! match (after a firmware update changed them, for example), every model's
//! stored state is meaningless and has to be cleared:
//!
//! 1. The mesh stack reports the load failure through a [`MeshEvent`]
//! 2. [`ModelCommon::config_apply`] clears the stack configuration and calls
//!    every registered model's [`ModelHooks::clear`]
//! 3. The metadata entry is rewritten with the running configuration

mod memory;
mod metadata;

pub use self::memory::MemoryStore;
pub use self::metadata::ModelCommon;

use crate::core::{EntryId, Result};

/// Persistent key-value configuration store
pub trait ConfigStore {
    /// Reads an entry; `None` if it was never written
    fn get(&self, id: EntryId) -> Result<Option<Vec<u8>>>;

    /// Writes an entry
    fn set(&mut self, id: EntryId, data: &[u8]) -> Result<()>;

    /// Deletes an entry
    fn delete(&mut self, id: EntryId) -> Result<()>;

    /// Erases the mesh stack's own configuration
    fn clear_stack_config(&mut self) -> Result<()>;
}

/// Events from the mesh stack that the model layer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshEvent {
    /// An entry could not be restored from persistent storage
    ConfigLoadFailure {
        /// Entry that failed to load
        id: EntryId,
    },
}

/// Initialization and reset entry points of a model
///
/// Each compiled-in model registers one implementation with
/// [`ModelCommon::register`]. Both methods default to doing nothing.
pub trait ModelHooks {
    /// Model name, for logs
    fn name(&self) -> &str;

    /// Called from [`ModelCommon::init`]
    fn init(&mut self) {}

    /// Called when stored model state has to be discarded
    fn clear(&mut self) {}
}
