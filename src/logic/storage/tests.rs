use mockito::Matcher;
use serde_json::{json, Map, Value};

use super::datastore::{decode_properties, encode_properties};
use super::*;
use crate::logic::error::StorageError;
use crate::logic::record::{transform, RawRecord};

fn sample_record() -> StorageRecord {
    let raw: RawRecord = serde_json::from_value(json!({
        "source_ip": "192.168.1.100",
        "destination_ip": "10.0.0.1",
        "protocol": "tcp",
        "payload_size": 1024,
        "feat1": 1
    }))
    .unwrap();
    transform(&raw).unwrap().0
}

fn sample_prediction() -> PredictionResult {
    PredictionResult {
        prediction: json!(1),
        model: "attack-detection-model".into(),
        endpoint: "http://localhost/predict".into(),
        timestamp: "2024-01-01T00:00:00Z".into(),
        features: vec![1.0, 0.0, 0.0, 0.0],
        message_id: None,
    }
}

fn datastore(server: &mockito::Server) -> DatastoreStore {
    DatastoreStore::new(DatastoreConfig {
        project_id: "proj".into(),
        base_url: server.url(),
        access_token: None,
        timeout_seconds: 5,
    })
}

// ============================================================================
// KEY
// ============================================================================

#[test]
fn test_entity_key_display() {
    assert_eq!(EntityKey::new("NetworkEvent", None, "7").to_string(), "NetworkEvent(7)");
    assert_eq!(
        EntityKey::new("NetworkEvent", Some("prod"), "7").to_string(),
        "prod:NetworkEvent(7)"
    );
}

// ============================================================================
// MEMORY + WRITER
// ============================================================================

#[test]
fn test_writer_assigns_distinct_keys() {
    let writer = StorageWriter::new(Box::new(MemoryStore::new()), "NetworkEvent", Some("lab".into()));
    let record = sample_record();

    let a = writer.write(&record).unwrap();
    let b = writer.write(&record).unwrap();

    assert_ne!(a, b);
    assert_eq!(a.kind, "NetworkEvent");
    assert_eq!(a.namespace.as_deref(), Some("lab"));
}

#[test]
fn test_attach_prediction_round_trip() {
    let writer = StorageWriter::new(Box::new(MemoryStore::new()), "NetworkEvent", None);
    let key = writer.write(&sample_record()).unwrap();

    assert!(writer.attach_prediction(&key, &sample_prediction()).unwrap());
}

#[test]
fn test_attach_prediction_missing_entity() {
    let writer = StorageWriter::new(Box::new(MemoryStore::new()), "NetworkEvent", None);
    let ghost = EntityKey::new("NetworkEvent", None, "999");

    assert!(!writer.attach_prediction(&ghost, &sample_prediction()).unwrap());
}

#[test]
fn test_memory_update_missing_is_not_found() {
    let store = MemoryStore::new();
    let key = EntityKey::new("K", None, "1");
    assert!(matches!(store.update(&key, &Map::new()), Err(StorageError::NotFound(_))));
}

// ============================================================================
// SQLITE
// ============================================================================

#[test]
fn test_sqlite_put_get_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("nested").join("pipeline.db")).unwrap();

    let props = sample_record().to_properties();
    let key = store.put(&props, "NetworkEvent", None).unwrap();
    assert_eq!(store.count("NetworkEvent").unwrap(), 1);

    let loaded = store.get(&key).unwrap().unwrap();
    assert_eq!(loaded["protocol"], "TCP");
    assert_eq!(loaded["payload_size"], 1024);

    let mut changed = loaded.clone();
    changed.insert("prediction".into(), json!({ "prediction": 1 }));
    store.update(&key, &changed).unwrap();

    let reloaded = store.get(&key).unwrap().unwrap();
    assert_eq!(reloaded["prediction"]["prediction"], 1);
}

#[test]
fn test_sqlite_namespaces_are_isolated() {
    let store = SqliteStore::open_in_memory().unwrap();
    let key = store.put(&Map::new(), "NetworkEvent", Some("a")).unwrap();

    let other_ns = EntityKey::new("NetworkEvent", Some("b"), key.id.clone());
    assert!(store.get(&other_ns).unwrap().is_none());
    assert!(matches!(store.update(&other_ns, &Map::new()), Err(StorageError::NotFound(_))));
    assert!(store.get(&key).unwrap().is_some());
}

#[test]
fn test_sqlite_closed_store_errors() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.health_check().unwrap();
    store.close().unwrap();

    assert!(matches!(store.health_check(), Err(StorageError::Backend(_))));
    // Closing twice is fine
    store.close().unwrap();
}

// ============================================================================
// DATASTORE
// ============================================================================

#[test]
fn test_encode_properties_types() {
    let mut props = Map::new();
    props.insert("s".into(), json!("x"));
    props.insert("i".into(), json!(5));
    props.insert("f".into(), json!(0.5));
    props.insert("b".into(), json!(true));
    props.insert("n".into(), Value::Null);
    props.insert("a".into(), json!([1, "y"]));
    props.insert("e".into(), json!({ "inner": 2 }));
    props.insert("raw_data".into(), json!("{}"));
    props.insert("big".into(), json!("z".repeat(2000)));

    let enc = encode_properties(&props);
    assert_eq!(enc["s"], json!({ "stringValue": "x" }));
    assert_eq!(enc["i"], json!({ "integerValue": "5" }));
    assert_eq!(enc["f"], json!({ "doubleValue": 0.5 }));
    assert_eq!(enc["b"], json!({ "booleanValue": true }));
    assert_eq!(enc["n"], json!({ "nullValue": null }));
    assert_eq!(enc["a"]["arrayValue"]["values"][1], json!({ "stringValue": "y" }));
    assert_eq!(enc["e"]["entityValue"]["properties"]["inner"], json!({ "integerValue": "2" }));
    assert_eq!(enc["raw_data"]["excludeFromIndexes"], true);
    assert_eq!(enc["big"]["excludeFromIndexes"], true);

    let decoded = decode_properties(&enc);
    assert_eq!(decoded, props);
}

#[test]
fn test_datastore_put_reads_allocated_id() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/projects/proj:commit")
        .match_body(Matcher::PartialJson(json!({
            "mode": "NON_TRANSACTIONAL",
            "mutations": [{ "insert": { "key": {
                "partitionId": { "projectId": "proj", "namespaceId": "lab" },
                "path": [{ "kind": "NetworkEvent" }]
            }}}]
        })))
        .with_status(200)
        .with_body(
            r#"{"mutationResults":[{"key":{"partitionId":{"projectId":"proj"},
               "path":[{"kind":"NetworkEvent","id":"5629499534213120"}]},"version":"1"}]}"#,
        )
        .create();

    let store = datastore(&server);
    let key = store
        .put(&sample_record().to_properties(), "NetworkEvent", Some("lab"))
        .unwrap();

    assert_eq!(key.id, "5629499534213120");
    assert_eq!(key.namespace.as_deref(), Some("lab"));
    mock.assert();
}

#[test]
fn test_datastore_get_decodes_found_entity() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/projects/proj:lookup")
        .with_status(200)
        .with_body(
            r#"{"found":[{"entity":{"key":{"path":[{"kind":"NetworkEvent","id":"1"}]},
               "properties":{"protocol":{"stringValue":"TCP"},"payload_size":{"integerValue":"1024"}}}}]}"#,
        )
        .create();

    let store = datastore(&server);
    let props = store.get(&EntityKey::new("NetworkEvent", None, "1")).unwrap().unwrap();
    assert_eq!(props["protocol"], "TCP");
    assert_eq!(props["payload_size"], 1024);
}

#[test]
fn test_datastore_integral_double_stays_double() {
    let wire = json!({ "feat2": { "doubleValue": 2 }, "threat_score": { "doubleValue": 1 } });
    let decoded = decode_properties(wire.as_object().unwrap());
    let encoded = encode_properties(&decoded);

    assert_eq!(encoded["feat2"], json!({ "doubleValue": 2.0 }));
    assert_eq!(encoded["threat_score"], json!({ "doubleValue": 1.0 }));
}

#[test]
fn test_datastore_attach_prediction_preserves_property_types() {
    let mut server = mockito::Server::new();
    let lookup = server
        .mock("POST", "/projects/proj:lookup")
        .with_status(200)
        .with_body(
            r#"{"found":[{"entity":{"key":{"path":[{"kind":"NetworkEvent","id":"7"}]},
               "properties":{"protocol":{"stringValue":"TCP"},"payload_size":{"integerValue":"1024"},
               "feat2":{"doubleValue":2}}}}]}"#,
        )
        .create();
    let update = server
        .mock("POST", "/projects/proj:commit")
        .match_body(Matcher::PartialJson(json!({
            "mode": "NON_TRANSACTIONAL",
            "mutations": [{ "update": {
                "key": { "path": [{ "kind": "NetworkEvent", "id": "7" }] },
                "properties": {
                    "protocol": { "stringValue": "TCP" },
                    "payload_size": { "integerValue": "1024" },
                    "feat2": { "doubleValue": 2.0 },
                    "prediction": { "entityValue": { "properties": {
                        "model": { "stringValue": "attack-detection-model" }
                    }}}
                }
            }}]
        })))
        .with_status(200)
        .with_body(r#"{"mutationResults":[{"version":"2"}]}"#)
        .create();

    let writer = StorageWriter::new(Box::new(datastore(&server)), "NetworkEvent", None);
    let key = EntityKey::new("NetworkEvent", None, "7");

    assert!(writer.attach_prediction(&key, &sample_prediction()).unwrap());
    lookup.assert();
    update.assert();
}

#[test]
fn test_datastore_get_missing_is_none() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/projects/proj:lookup")
        .with_status(200)
        .with_body(r#"{"missing":[{"entity":{"key":{}}}]}"#)
        .create();

    let store = datastore(&server);
    assert!(store.get(&EntityKey::new("NetworkEvent", None, "1")).unwrap().is_none());
}

#[test]
fn test_datastore_status_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/projects/proj:commit")
        .with_status(403)
        .with_body(r#"{"error":{"status":"PERMISSION_DENIED"}}"#)
        .create();

    let store = datastore(&server);
    match store.put(&Map::new(), "NetworkEvent", None) {
        Err(StorageError::Status { code, body }) => {
            assert_eq!(code, 403);
            assert!(body.contains("PERMISSION_DENIED"));
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
}

#[test]
fn test_datastore_unreachable_is_transport() {
    let store = DatastoreStore::new(DatastoreConfig {
        project_id: "proj".into(),
        base_url: "http://127.0.0.1:1".into(),
        access_token: None,
        timeout_seconds: 1,
    });
    assert!(matches!(store.health_check(), Err(StorageError::Transport(_))));
}
