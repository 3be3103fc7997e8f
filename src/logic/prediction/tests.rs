use std::collections::BTreeMap;

use mockito::Matcher;
use serde_json::{json, Value};

use super::endpoint::ScoringEndpoint;
use super::publisher::Publisher;
use super::*;
use crate::logic::error::{PredictionError, PublishError};
use crate::logic::record::PredictionRecord;

fn record_with_features() -> PredictionRecord {
    let mut features = BTreeMap::new();
    features.insert("feat1".to_string(), 1.0);
    features.insert("feat2".to_string(), 2.0);
    features.insert("feat3".to_string(), 4688.0);
    features.insert("feat4".to_string(), 10.0);

    PredictionRecord {
        timestamp: "2024-01-01T00:00:00Z".into(),
        source_ip: "10.0.0.5".into(),
        destination_ip: "10.0.0.9".into(),
        protocol: "TCP".into(),
        payload_size: 512,
        threat_score: None,
        features,
    }
}

struct FixedEndpoint(Value);

impl ScoringEndpoint for FixedEndpoint {
    fn url(&self) -> &str {
        "http://fixed/predict"
    }

    fn predict(&self, instances: &[Vec<f64>]) -> Result<Vec<Value>, PredictionError> {
        assert_eq!(instances.len(), 1);
        Ok(vec![self.0.clone()])
    }
}

struct FailingPublisher;

impl Publisher for FailingPublisher {
    fn publish(&self, _topic: &str, _data: &[u8]) -> Result<String, PublishError> {
        Err(PublishError::Transport("connection refused".into()))
    }
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

#[test]
fn test_schema_builds_vector_in_order() {
    let schema = FeatureSchema::default();
    let v = schema.vector(&record_with_features()).unwrap();
    assert_eq!(v, vec![1.0, 2.0, 4688.0, 10.0]);
}

#[test]
fn test_schema_resolves_known_fields() {
    let mut record = record_with_features();
    record.threat_score = Some(0.5);
    let schema = FeatureSchema::parse("payload_size, threat_score");
    assert_eq!(schema.vector(&record).unwrap(), vec![512.0, 0.5]);
}

#[test]
fn test_schema_reports_all_missing() {
    let mut record = record_with_features();
    record.features.clear();

    match FeatureSchema::default().vector(&record) {
        Err(PredictionError::InvalidFeatures(missing)) => {
            assert_eq!(missing, vec!["feat1", "feat2", "feat3", "feat4"]);
        }
        other => panic!("Expected InvalidFeatures, got {:?}", other),
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[test]
fn test_client_returns_first_prediction() {
    let client = PredictionClient::new(Box::new(FixedEndpoint(json!(1))), FeatureSchema::default(), "m1");
    let scored = client.predict(&record_with_features()).unwrap();

    assert_eq!(scored.result.prediction, json!(1));
    assert_eq!(scored.result.model, "m1");
    assert_eq!(scored.result.endpoint, "http://fixed/predict");
    assert_eq!(scored.result.features, vec![1.0, 2.0, 4688.0, 10.0]);
    assert!(scored.result.message_id.is_none());
    assert!(scored.publish_error.is_none());
}

#[test]
fn test_publish_failure_keeps_prediction() {
    let client = PredictionClient::new(Box::new(FixedEndpoint(json!(0))), FeatureSchema::default(), "m1")
        .with_publisher(Box::new(FailingPublisher), "alerts");

    let scored = client.predict(&record_with_features()).unwrap();
    assert_eq!(scored.result.prediction, json!(0));
    assert!(scored.result.message_id.is_none());
    assert!(matches!(scored.publish_error, Some(PublishError::Transport(_))));
}

#[test]
fn test_missing_features_fail_before_http() {
    let mut record = record_with_features();
    record.features.remove("feat2");

    let client = PredictionClient::new(Box::new(FixedEndpoint(json!(1))), FeatureSchema::default(), "m1");
    assert!(matches!(
        client.predict(&record),
        Err(PredictionError::InvalidFeatures(_))
    ));
}

// ============================================================================
// HTTP
// ============================================================================

#[test]
fn test_http_endpoint_posts_instances() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/predict")
        .match_body(Matcher::Json(json!({ "instances": [[1.0, 2.0]] })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"predictions": [1]}"#)
        .create();

    let endpoint = HttpScoringEndpoint::new(format!("{}/predict", server.url()), None, 5);
    let predictions = endpoint.predict(&[vec![1.0, 2.0]]).unwrap();

    assert_eq!(predictions, vec![json!(1)]);
    mock.assert();
}

#[test]
fn test_http_endpoint_missing_predictions() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/predict")
        .with_status(200)
        .with_body(r#"{"error": "bad model"}"#)
        .create();

    let endpoint = HttpScoringEndpoint::new(format!("{}/predict", server.url()), None, 5);
    assert!(matches!(
        endpoint.predict(&[vec![1.0]]),
        Err(PredictionError::MalformedResponse(_))
    ));
}

#[test]
fn test_http_endpoint_status_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/predict")
        .with_status(400)
        .with_body(r#"{"error": "No instances provided"}"#)
        .create();

    let endpoint = HttpScoringEndpoint::new(format!("{}/predict", server.url()), None, 5);
    match endpoint.predict(&[vec![1.0]]) {
        Err(PredictionError::Status { code, body }) => {
            assert_eq!(code, 400);
            assert!(body.contains("No instances"));
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
}

#[test]
fn test_pubsub_publish_returns_message_id() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/projects/proj/topics/alerts:publish")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::PartialJson(json!({ "messages": [{ "data": "eyJhIjoxfQ==" }] })))
        .with_status(200)
        .with_body(r#"{"messageIds": ["42"]}"#)
        .create();

    let publisher = PubSubPublisher::new(server.url(), "proj", Some("tok".into()), 5);
    let id = publisher.publish("alerts", br#"{"a":1}"#).unwrap();

    assert_eq!(id, "42");
    mock.assert();
}

#[test]
fn test_pubsub_empty_ids_is_malformed() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/projects/proj/topics/alerts:publish")
        .with_status(200)
        .with_body(r#"{"messageIds": []}"#)
        .create();

    let publisher = PubSubPublisher::new(server.url(), "proj", None, 5);
    assert!(matches!(
        publisher.publish("alerts", b"{}"),
        Err(PublishError::MalformedResponse(_))
    ));
}
