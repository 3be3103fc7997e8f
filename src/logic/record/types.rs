//! Record types
//!
//! RawRecord is whatever the producer sent. StorageRecord and PredictionRecord
//! are the two normalized views built from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names the transformer requires, in reporting order
pub const REQUIRED_FIELDS: [&str; 4] = ["source_ip", "destination_ip", "protocol", "payload_size"];

/// Names owned by StorageRecord's known fields; never copied into `extra`
pub const RESERVED_FIELDS: [&str; 8] = [
    "timestamp",
    "source_ip",
    "destination_ip",
    "protocol",
    "payload_size",
    "processed_at",
    "source",
    "raw_data",
];

// ============================================================================
// RAW RECORD
// ============================================================================

/// Producer-controlled mapping of field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Field value, with JSON null treated as absent
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Compact JSON text of the whole record
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// STORAGE RECORD
// ============================================================================

/// Persisted form of a record: known fields plus an open extension map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub timestamp: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub protocol: String,
    pub payload_size: i64,
    pub processed_at: String,
    pub source: String,
    pub raw_data: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StorageRecord {
    /// Flat property map as written to the store
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("timestamp".into(), Value::from(self.timestamp.clone()));
        props.insert("source_ip".into(), Value::from(self.source_ip.clone()));
        props.insert("destination_ip".into(), Value::from(self.destination_ip.clone()));
        props.insert("protocol".into(), Value::from(self.protocol.clone()));
        props.insert("payload_size".into(), Value::from(self.payload_size));
        props.insert("processed_at".into(), Value::from(self.processed_at.clone()));
        props.insert("source".into(), Value::from(self.source.clone()));
        props.insert("raw_data".into(), Value::from(self.raw_data.clone()));
        for (k, v) in &self.extra {
            props.insert(k.clone(), v.clone());
        }
        props
    }
}

// ============================================================================
// PREDICTION RECORD
// ============================================================================

/// Model-input form of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub timestamp: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub protocol: String,
    pub payload_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_score: Option<f64>,
    /// Numeric extra fields (e.g. feat1..feat4 from the log parser)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
}

impl PredictionRecord {
    /// Resolve a named numeric input
    pub fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "payload_size" => Some(self.payload_size as f64),
            "threat_score" => self.threat_score,
            other => self.features.get(other).copied(),
        }
    }
}
