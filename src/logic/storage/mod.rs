//! Storage Module
//!
//! Persists StorageRecords to a durable key-value store.
//!
//! ## Structure
//! - `datastore.rs` - Google Cloud Datastore (REST v1)
//! - `sqlite.rs` - Local SQLite file for offline runs
//! - `memory.rs` - In-process map for dry runs
//!
//! All backends sit behind `EntityStore`; `StorageWriter` binds one to a
//! collection and namespace.

pub mod datastore;
pub mod sqlite;
pub mod memory;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logic::error::StorageError;
use crate::logic::prediction::PredictionResult;
use crate::logic::record::StorageRecord;

pub use datastore::{DatastoreConfig, DatastoreStore};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Entity property map
pub type Properties = Map<String, Value>;

/// Property holding the attached prediction
pub const PREDICTION_PROPERTY: &str = "prediction";

// ============================================================================
// KEY
// ============================================================================

/// Opaque handle to a stored entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: impl Into<String>, namespace: Option<&str>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.map(str::to_string),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}({})", ns, self.kind, self.id),
            None => write!(f, "{}({})", self.kind, self.id),
        }
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable key-value store holding entities grouped by collection
pub trait EntityStore: Send {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Insert under a fresh key in `collection`
    fn put(
        &self,
        properties: &Properties,
        collection: &str,
        namespace: Option<&str>,
    ) -> Result<EntityKey, StorageError>;

    /// Read an entity back; `None` if it does not exist
    fn get(&self, key: &EntityKey) -> Result<Option<Properties>, StorageError>;

    /// Replace an existing entity's properties
    fn update(&self, key: &EntityKey, properties: &Properties) -> Result<(), StorageError>;

    /// Verify the store is reachable
    fn health_check(&self) -> Result<(), StorageError>;

    /// Release backend resources
    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

// ============================================================================
// WRITER
// ============================================================================

/// Store bound to one collection and namespace
pub struct StorageWriter {
    store: Box<dyn EntityStore>,
    collection: String,
    namespace: Option<String>,
}

impl StorageWriter {
    pub fn new(store: Box<dyn EntityStore>, collection: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            namespace,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Persist a record under an auto-generated key
    pub fn write(&self, record: &StorageRecord) -> Result<EntityKey, StorageError> {
        let key = self
            .store
            .put(&record.to_properties(), &self.collection, self.namespace.as_deref())?;

        tracing::debug!(entity_key = %key, backend = self.store.name(), "Stored record");
        Ok(key)
    }

    /// Fetch a stored entity
    pub fn read(&self, key: &EntityKey) -> Result<Option<Properties>, StorageError> {
        self.store.get(key)
    }

    /// Read the entity back, set its prediction and write it again.
    ///
    /// Returns `false` when the entity no longer exists.
    pub fn attach_prediction(&self, key: &EntityKey, prediction: &PredictionResult) -> Result<bool, StorageError> {
        let value = serde_json::to_value(prediction)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;

        let Some(mut properties) = self.store.get(key)? else {
            return Ok(false);
        };

        properties.insert(PREDICTION_PROPERTY.to_string(), value);
        self.store.update(key, &properties)?;

        tracing::debug!(entity_key = %key, "Attached prediction to entity");
        Ok(true)
    }

    pub fn health_check(&self) -> Result<(), StorageError> {
        self.store.health_check()
    }

    pub fn close(&self) -> Result<(), StorageError> {
        self.store.close()
    }
}
