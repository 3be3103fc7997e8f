//! Cloud Datastore Store
//!
//! Talks to the Datastore REST API (v1) with a blocking `ureq` agent.
//! Works against production or a local emulator (`DATASTORE_EMULATOR_HOST`).
//!
//! - `put`    -> `:commit` NON_TRANSACTIONAL, `insert` on an incomplete key
//! - `get`    -> `:lookup`
//! - `update` -> `:commit` NON_TRANSACTIONAL, `update` on the full key

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{EntityKey, EntityStore, Properties};
use crate::constants;
use crate::logic::error::StorageError;

/// Properties never indexed regardless of size
const UNINDEXED_PROPERTIES: [&str; 1] = ["raw_data"];

/// Kind used by `health_check` lookups
const HEALTH_KIND: &str = "__pipeline_health__";

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    pub project_id: String,
    /// API base, e.g. `https://datastore.googleapis.com/v1`
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            project_id: constants::get_project_id(),
            base_url: constants::get_datastore_url(),
            access_token: constants::get_access_token(),
            timeout_seconds: constants::get_http_timeout_secs(),
        }
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionId {
    project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PathElement {
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireKey {
    partition_id: PartitionId,
    path: Vec<PathElement>,
}

#[derive(Debug, Deserialize)]
struct WireEntity {
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    mutation_results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    #[serde(default)]
    key: Option<WireKey>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    found: Vec<EntityResult>,
}

#[derive(Debug, Deserialize)]
struct EntityResult {
    entity: WireEntity,
}

// ============================================================================
// STORE
// ============================================================================

pub struct DatastoreStore {
    config: DatastoreConfig,
    agent: ureq::Agent,
}

impl DatastoreStore {
    pub fn new(config: DatastoreConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build();

        tracing::info!(
            project_id = %config.project_id,
            base_url = %config.base_url,
            "Datastore client initialized"
        );

        Self { config, agent }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/projects/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            method
        )
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, StorageError> {
        let mut request = self
            .agent
            .post(&self.endpoint(method))
            .set("Content-Type", "application/json");
        if let Some(token) = &self.config.access_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request.send_string(&body.to_string())?;
        let text = response
            .into_string()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| StorageError::Malformed(e.to_string()))
    }

    fn wire_key(&self, kind: &str, namespace: Option<&str>, id: Option<&str>) -> WireKey {
        let mut element = PathElement {
            kind: kind.to_string(),
            ..Default::default()
        };
        match id {
            Some(id) if id.parse::<i64>().is_ok() => element.id = Some(id.to_string()),
            Some(name) => element.name = Some(name.to_string()),
            None => {}
        }

        WireKey {
            partition_id: PartitionId {
                project_id: self.config.project_id.clone(),
                namespace_id: namespace.map(str::to_string),
            },
            path: vec![element],
        }
    }

    fn commit(&self, mutation: Value) -> Result<CommitResponse, StorageError> {
        let body = json!({
            "mode": "NON_TRANSACTIONAL",
            "mutations": [mutation],
        });
        self.call("commit", &body)
    }
}

impl EntityStore for DatastoreStore {
    fn name(&self) -> &'static str {
        "datastore"
    }

    fn put(
        &self,
        properties: &Properties,
        collection: &str,
        namespace: Option<&str>,
    ) -> Result<EntityKey, StorageError> {
        let entity = json!({
            "key": self.wire_key(collection, namespace, None),
            "properties": encode_properties(properties),
        });

        let response = self.commit(json!({ "insert": entity }))?;

        let allocated = response
            .mutation_results
            .into_iter()
            .next()
            .and_then(|r| r.key)
            .and_then(|k| k.path.into_iter().last())
            .and_then(|p| p.id.or(p.name))
            .ok_or_else(|| StorageError::Malformed("commit returned no allocated key".into()))?;

        Ok(EntityKey::new(collection, namespace, allocated))
    }

    fn get(&self, key: &EntityKey) -> Result<Option<Properties>, StorageError> {
        let body = json!({
            "keys": [self.wire_key(&key.kind, key.namespace.as_deref(), Some(&key.id))],
        });

        let response: LookupResponse = self.call("lookup", &body)?;
        Ok(response
            .found
            .into_iter()
            .next()
            .map(|r| decode_properties(&r.entity.properties)))
    }

    fn update(&self, key: &EntityKey, properties: &Properties) -> Result<(), StorageError> {
        let entity = json!({
            "key": self.wire_key(&key.kind, key.namespace.as_deref(), Some(&key.id)),
            "properties": encode_properties(properties),
        });

        match self.commit(json!({ "update": entity })) {
            Ok(_) => Ok(()),
            Err(StorageError::NotFound(_)) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e),
        }
    }

    fn health_check(&self) -> Result<(), StorageError> {
        let body = json!({
            "keys": [self.wire_key(HEALTH_KIND, None, Some("ping"))],
        });
        let _: LookupResponse = self.call("lookup", &body)?;
        Ok(())
    }
}

// ============================================================================
// VALUE ENCODING
// ============================================================================

/// JSON properties -> Datastore `Value` objects
pub fn encode_properties(properties: &Properties) -> Map<String, Value> {
    properties
        .iter()
        .map(|(name, value)| {
            let mut encoded = encode_value(value);
            if UNINDEXED_PROPERTIES.contains(&name.as_str()) {
                encoded["excludeFromIndexes"] = Value::Bool(true);
            }
            (name.clone(), encoded)
        })
        .collect()
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => {
            if s.len() > constants::DATASTORE_MAX_INDEXED_BYTES {
                json!({ "stringValue": s, "excludeFromIndexes": true })
            } else {
                json!({ "stringValue": s })
            }
        }
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "entityValue": { "properties": encode_properties(map) }
        }),
    }
}

/// Datastore `Value` objects -> JSON properties
pub fn decode_properties(properties: &Map<String, Value>) -> Properties {
    properties
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };

    if let Some(s) = obj.get("integerValue") {
        return s
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| s.clone());
    }
    if let Some(v) = obj.get("doubleValue") {
        // Integral doubles arrive as bare JSON integers
        return v.as_f64().map(Value::from).unwrap_or_else(|| v.clone());
    }
    if let Some(v) = obj.get("booleanValue") {
        return v.clone();
    }
    if let Some(v) = obj.get("stringValue") {
        return v.clone();
    }
    if let Some(v) = obj.get("timestampValue") {
        return v.clone();
    }
    if obj.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(array) = obj.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(entity) = obj.get("entityValue") {
        let props = entity
            .get("properties")
            .and_then(Value::as_object)
            .map(decode_properties)
            .unwrap_or_default();
        return Value::Object(props);
    }

    value.clone()
}
