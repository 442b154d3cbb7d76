use tracing::{debug, info, warn};

use crate::core::{
    EntryId, Error, InstanceLimits, ModelMetadata, Result, MODEL_COMMON_METADATA_EID, MODEL_FILE_ID,
};

use super::{ConfigStore, MeshEvent, ModelHooks};

#[derive(Debug, Default, Clone, Copy)]
struct Status {
    metadata_stored: bool,
    load_failed: bool,
}

/// Metadata lifecycle shared by all persistent models
///
/// Typical startup sequence:
///
/// 1. [`init`](Self::init) once the models are registered
/// 2. [`load`](Self::load) (and [`handle_event`](Self::handle_event) for
///    whatever the stack reports while restoring)
/// 3. [`config_apply`](Self::config_apply)
pub struct ModelCommon<S> {
    store: S,
    limits: InstanceLimits,
    hooks: Vec<Box<dyn ModelHooks>>,
    status: Status,
}

impl<S: ConfigStore> ModelCommon<S> {
    /// Creates the model layer for the given build configuration
    pub fn new(store: S, limits: InstanceLimits) -> Self {
        ModelCommon {
            store,
            limits,
            hooks: Vec::new(),
            status: Status::default(),
        }
    }

    /// Registers a model's init and clear hooks
    pub fn register(&mut self, hooks: impl ModelHooks + 'static) {
        self.hooks.push(Box::new(hooks));
    }

    /// Resets the load status and initializes every registered model
    pub fn init(&mut self) {
        self.status.load_failed = false;
        for hooks in &mut self.hooks {
            debug!(model = hooks.name(), "init");
            hooks.init();
        }
    }

    /// Reacts to a mesh stack event
    pub fn handle_event(&mut self, event: &MeshEvent) {
        match event {
            MeshEvent::ConfigLoadFailure { id } if id.file == MODEL_FILE_ID => {
                warn!(record = id.record, "model config failed to load");
                self.status.load_failed = true;
            }
            _ => {}
        }
    }

    /// Restores the metadata entry from the store
    ///
    /// A stored record that does not match the running configuration marks
    /// the load as failed; it is not an error of this call.
    pub fn load(&mut self) -> Result<()> {
        let data = match self.store.get(MODEL_COMMON_METADATA_EID)? {
            Some(data) => data,
            None => return Ok(()),
        };

        if let Err(e) = self.metadata_set(MODEL_COMMON_METADATA_EID, &data) {
            warn!("stored model metadata rejected: {}", e);
            self.handle_event(&MeshEvent::ConfigLoadFailure { id: MODEL_COMMON_METADATA_EID });
        }
        Ok(())
    }

    /// Accepts a metadata record if it matches the running configuration
    pub fn metadata_set(&mut self, id: EntryId, data: &[u8]) -> Result<()> {
        if id != MODEL_COMMON_METADATA_EID {
            return Err(Error::storage(format!("not a model metadata entry: {:?}", id)));
        }
        if data.len() != ModelMetadata::ENCODED_LEN {
            return Err(Error::InvalidPersistedData);
        }

        let metadata: ModelMetadata = bincode::deserialize(data)?;
        if !metadata.matches(&self.limits) {
            return Err(Error::InvalidPersistedData);
        }

        self.status.metadata_stored = true;
        Ok(())
    }

    /// The metadata record describing the running configuration
    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata::from(self.limits)
    }

    /// Finishes startup, recovering from a failed load
    ///
    /// After a failed load all stored model state is cleared, the metadata
    /// is rewritten and `InvalidPersistedData` is returned. The failure
    /// stays recorded until the next [`init`](Self::init).
    pub fn config_apply(&mut self) -> Result<()> {
        if self.status.load_failed {
            warn!("model config load failed, clearing stored model state");
            self.store.clear_stack_config()?;
            for hooks in &mut self.hooks {
                debug!(model = hooks.name(), "clear");
                hooks.clear();
            }

            self.status.metadata_stored = false;
            if let Err(e) = self.store.delete(MODEL_COMMON_METADATA_EID) {
                debug!("metadata delete failed: {}", e);
            }

            self.metadata_store()?;
            return Err(Error::InvalidPersistedData);
        }

        if !self.status.metadata_stored {
            self.metadata_store()?;
        }

        Ok(())
    }

    fn metadata_store(&mut self) -> Result<()> {
        let data = bincode::serialize(&self.metadata())?;
        self.metadata_set(MODEL_COMMON_METADATA_EID, &data)?;
        if let Err(e) = self.store.set(MODEL_COMMON_METADATA_EID, &data) {
            self.status.metadata_stored = false;
            return Err(e);
        }

        info!(limits = ?self.limits, "model metadata stored");
        Ok(())
    }

    /// Whether a matching metadata record is known to be stored
    pub fn is_metadata_stored(&self) -> bool {
        self.status.metadata_stored
    }

    /// Whether loading failed since the last `init`
    pub fn is_load_failed(&self) -> bool {
        self.status.load_failed
    }

    /// Running configuration
    pub fn limits(&self) -> &InstanceLimits {
        &self.limits
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MODEL_COMMON_RECORD_ID;
    use crate::storage::MemoryStore;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl ModelHooks for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn init(&mut self) {
            self.log.lock().unwrap().push(format!("{} init", self.name));
        }

        fn clear(&mut self) {
            self.log.lock().unwrap().push(format!("{} clear", self.name));
        }
    }

    struct Silent;

    impl ModelHooks for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    fn limits() -> InstanceLimits {
        InstanceLimits {
            light_lightness: 2,
            light_lc: 1,
            light_ctl: 3,
        }
    }

    fn common(store: &MemoryStore, log: &Log) -> ModelCommon<MemoryStore> {
        let mut common = ModelCommon::new(store.clone(), limits());
        for name in ["light_lightness", "light_lc", "light_ctl"] {
            common.register(Recorder {
                name,
                log: log.clone(),
            });
        }
        common.register(Silent);
        common
    }

    #[test]
    fn test_first_boot_stores_metadata() {
        let store = MemoryStore::new();
        let log = Log::default();
        let mut common = common(&store, &log);

        common.init();
        common.load().unwrap();
        assert!(!common.is_metadata_stored());
        common.config_apply().unwrap();

        assert!(common.is_metadata_stored());
        assert_eq!(store.entry(MODEL_COMMON_METADATA_EID), Some(vec![2, 0, 1, 0, 3, 0]));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["light_lightness init", "light_lc init", "light_ctl init"]
        );
    }

    #[test]
    fn test_matching_metadata_is_not_rewritten() {
        let mut store = MemoryStore::new();
        store.set(MODEL_COMMON_METADATA_EID, &[2, 0, 1, 0, 3, 0]).unwrap();
        let log = Log::default();
        let mut common = common(&store, &log);

        common.init();
        common.load().unwrap();
        assert!(common.is_metadata_stored());

        store.set_read_only(true);
        common.config_apply().unwrap();
        assert_eq!(store.stack_clears(), 0);
    }

    #[test]
    fn test_mismatch_triggers_recovery() {
        let mut store = MemoryStore::new();
        store.set(MODEL_COMMON_METADATA_EID, &[1, 0, 1, 0, 1, 0]).unwrap();
        let log = Log::default();
        let mut common = common(&store, &log);

        common.init();
        common.load().unwrap();
        assert!(common.is_load_failed());
        assert!(!common.is_metadata_stored());

        let err = common.config_apply().unwrap_err();
        assert!(matches!(err, Error::InvalidPersistedData));
        assert_eq!(store.stack_clears(), 1);
        assert_eq!(store.entry(MODEL_COMMON_METADATA_EID), Some(vec![2, 0, 1, 0, 3, 0]));
        assert!(common.is_metadata_stored());

        let log = log.lock().unwrap();
        assert_eq!(
            log[3..],
            ["light_lightness clear", "light_lc clear", "light_ctl clear"]
        );
    }

    #[test]
    fn test_load_failure_event() {
        let store = MemoryStore::new();
        let log = Log::default();
        let mut common = common(&store, &log);
        common.init();

        common.handle_event(&MeshEvent::ConfigLoadFailure { id: EntryId::new(0x0001, 0x0001) });
        assert!(!common.is_load_failed());

        common.handle_event(&MeshEvent::ConfigLoadFailure {
            id: EntryId::new(MODEL_FILE_ID, 0x0042),
        });
        assert!(common.is_load_failed());
        assert!(common.config_apply().is_err());

        common.init();
        assert!(!common.is_load_failed());
        common.config_apply().unwrap();
    }

    #[test]
    fn test_metadata_setter_validation() {
        let store = MemoryStore::new();
        let mut common = ModelCommon::new(store, limits());

        let other = EntryId::new(MODEL_FILE_ID, MODEL_COMMON_RECORD_ID + 1);
        assert!(matches!(common.metadata_set(other, &[2, 0, 1, 0, 3, 0]), Err(Error::Storage(_))));
        assert!(matches!(
            common.metadata_set(MODEL_COMMON_METADATA_EID, &[2, 0, 1, 0]),
            Err(Error::InvalidPersistedData)
        ));
        assert!(matches!(
            common.metadata_set(MODEL_COMMON_METADATA_EID, &[2, 0, 1, 0, 3, 0, 0]),
            Err(Error::InvalidPersistedData)
        ));
        assert!(!common.is_metadata_stored());

        common.metadata_set(MODEL_COMMON_METADATA_EID, &[2, 0, 1, 0, 3, 0]).unwrap();
        assert!(common.is_metadata_stored());
        assert_eq!(common.metadata(), ModelMetadata::from(limits()));
    }

    #[test]
    fn test_store_failure_is_reported() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let mut common = ModelCommon::new(store, limits());

        assert!(matches!(common.config_apply(), Err(Error::Storage(_))));
        assert!(!common.is_metadata_stored());
    }
}
