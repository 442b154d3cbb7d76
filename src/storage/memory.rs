use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{EntryId, Error, Result};

use super::ConfigStore;

/// In-memory configuration store for testing and host builds
///
/// Clones share the same entries, so a test can inspect the store after
/// handing it to a [`ModelCommon`](super::ModelCommon).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: HashMap<EntryId, Vec<u8>>,
    stack_clears: usize,
    read_only: bool,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().expect("MemoryStore mutex poisoned")
    }

    /// Raw bytes of an entry
    pub fn entry(&self, id: EntryId) -> Option<Vec<u8>> {
        self.inner().entries.get(&id).cloned()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner().entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner().entries.is_empty()
    }

    /// How many times the stack configuration was cleared
    pub fn stack_clears(&self) -> usize {
        self.inner().stack_clears
    }

    /// Makes every subsequent write fail
    pub fn set_read_only(&self, read_only: bool) {
        self.inner().read_only = read_only;
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, id: EntryId) -> Result<Option<Vec<u8>>> {
        Ok(self.entry(id))
    }

    fn set(&mut self, id: EntryId, data: &[u8]) -> Result<()> {
        let mut inner = self.inner();
        if inner.read_only {
            return Err(Error::storage(format!("store is read-only, cannot write {:?}", id)));
        }
        inner.entries.insert(id, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, id: EntryId) -> Result<()> {
        let mut inner = self.inner();
        if inner.read_only {
            return Err(Error::storage(format!("store is read-only, cannot delete {:?}", id)));
        }
        inner.entries.remove(&id);
        Ok(())
    }

    fn clear_stack_config(&mut self) -> Result<()> {
        let mut inner = self.inner();
        inner.stack_clears += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries() {
        let mut store = MemoryStore::new();
        let id = EntryId::new(1, 2);
        assert_eq!(store.get(id).unwrap(), None);

        store.set(id, &[1, 2, 3]).unwrap();
        assert_eq!(store.get(id).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);

        store.delete(id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let mut store = MemoryStore::new();
        let probe = store.clone();
        store.set(EntryId::new(1, 1), &[9]).unwrap();
        assert_eq!(probe.entry(EntryId::new(1, 1)), Some(vec![9]));
    }

    #[test]
    fn test_read_only() {
        let mut store = MemoryStore::new();
        store.set_read_only(true);
        assert!(matches!(store.set(EntryId::new(1, 1), &[0]), Err(Error::Storage(_))));
    }
}
