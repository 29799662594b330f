// In-process store, shared between clones

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::store::{Envelope, TokenStore};
use crate::error::StoreError;

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Envelope>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Envelope>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of entries, including ones whose TTL has lapsed but were not read yet
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().get(key).is_some_and(|e| !e.is_expired())
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock();
        if entries.get(key).is_some_and(Envelope::is_expired) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.record.clone()))
    }

    fn set(&self, key: &str, record: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), Envelope::new(record, ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}
