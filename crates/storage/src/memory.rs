use std::collections::HashMap;
use std::sync::Mutex;

use super::error::{LockPoisonedSnafu, StorageResult};
use super::{RecordStore, ensure_key};

/// Process-local record store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        ensure_key(key, "memory-get-key")?;
        let records = self
            .records
            .lock()
            .map_err(|_| LockPoisonedSnafu { stage: "memory-get" }.build())?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        ensure_key(key, "memory-set-key")?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| LockPoisonedSnafu { stage: "memory-set" }.build())?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        ensure_key(key, "memory-remove-key")?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| LockPoisonedSnafu {
                stage: "memory-remove",
            }
            .build())?;
        records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[test]
    fn overwrite_replaces_whole_record() {
        let store = MemoryStore::new();
        store.set("history", "[1]").unwrap();
        store.set("history", "[1,2]").unwrap();

        assert_eq!(store.get("history").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_missing_key_is_not_an_error() {
        let store = MemoryStore::new();
        store.remove("history").unwrap();
        assert!(store.get("history").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn blank_keys_are_rejected() {
        let store = MemoryStore::new();
        let error = store.set("  ", "value").unwrap_err();
        assert!(matches!(error, StorageError::EmptyKey { .. }));
        assert_eq!(error.stage(), "memory-set-key");
    }
}
