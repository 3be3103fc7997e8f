//! In-memory store for dry runs. Nothing survives the process.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{EntityKey, EntityStore, Properties};
use crate::logic::error::StorageError;

#[derive(Default)]
struct State {
    next_id: u64,
    entities: HashMap<EntityKey, Properties>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(
        &self,
        properties: &Properties,
        collection: &str,
        namespace: Option<&str>,
    ) -> Result<EntityKey, StorageError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let key = EntityKey::new(collection, namespace, state.next_id.to_string());
        state.entities.insert(key.clone(), properties.clone());
        Ok(key)
    }

    fn get(&self, key: &EntityKey) -> Result<Option<Properties>, StorageError> {
        Ok(self.state.lock().entities.get(key).cloned())
    }

    fn update(&self, key: &EntityKey, properties: &Properties) -> Result<(), StorageError> {
        match self.state.lock().entities.get_mut(key) {
            Some(existing) => {
                *existing = properties.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
