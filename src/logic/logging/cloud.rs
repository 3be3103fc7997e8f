//! Cloud Logging Sink
//!
//! `tracing` layer that mirrors events to Google Cloud Logging
//! (`entries:write`) as structured `jsonPayload` entries. Entries are buffered
//! and sent in batches; failures go to stderr and are otherwise dropped.

use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::constants;

/// Entries buffered before a write
const DEFAULT_BATCH_SIZE: usize = 20;

/// Targets never forwarded (the sink's own HTTP stack)
const SKIPPED_TARGETS: [&str; 2] = ["ureq", "rustls"];

thread_local! {
    static FLUSHING: Cell<bool> = Cell::new(false);
}

#[derive(Debug, Clone)]
pub struct CloudLoggingConfig {
    pub project_id: String,
    pub log_name: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub batch_size: usize,
    pub timeout_seconds: u64,
}

impl CloudLoggingConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            log_name: constants::non_empty_var("CLOUD_LOG_NAME")
                .unwrap_or_else(|| constants::DEFAULT_CLOUD_LOG_NAME.to_string()),
            endpoint: constants::DEFAULT_CLOUD_LOGGING_URL.to_string(),
            access_token: constants::get_access_token(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_seconds: constants::get_http_timeout_secs(),
        }
    }

    fn log_path(&self) -> String {
        format!("projects/{}/logs/{}", self.project_id, self.log_name)
    }
}

// ============================================================================
// SINK
// ============================================================================

pub struct CloudLogSink {
    config: CloudLoggingConfig,
    agent: ureq::Agent,
    buffer: Mutex<Vec<Value>>,
}

impl CloudLogSink {
    pub fn new(config: CloudLoggingConfig) -> Arc<Self> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build();

        Arc::new(Self {
            config,
            agent,
            buffer: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, entry: Value) {
        let ready = {
            let mut buffer = self.buffer.lock();
            buffer.push(entry);
            buffer.len() >= self.config.batch_size.max(1)
        };
        if ready {
            self.flush();
        }
    }

    /// Send everything buffered. Never fails; problems are reported on stderr.
    pub fn flush(&self) {
        let entries: Vec<Value> = std::mem::take(&mut *self.buffer.lock());
        if entries.is_empty() {
            return;
        }

        FLUSHING.with(|f| f.set(true));
        let result = self.write(&entries);
        FLUSHING.with(|f| f.set(false));

        if let Err(e) = result {
            eprintln!("cloud logging: dropped {} entries: {}", entries.len(), e);
        }
    }

    fn write(&self, entries: &[Value]) -> Result<(), String> {
        let body = json!({
            "logName": self.config.log_path(),
            "resource": { "type": "global" },
            "entries": entries,
        });

        let mut request = self
            .agent
            .post(&self.config.endpoint)
            .set("Content-Type", "application/json");
        if let Some(token) = &self.config.access_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        request
            .send_string(&body.to_string())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }
}

// ============================================================================
// LAYER
// ============================================================================

pub struct CloudLoggingLayer {
    sink: Arc<CloudLogSink>,
}

impl CloudLoggingLayer {
    pub fn new(sink: Arc<CloudLogSink>) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber> Layer<S> for CloudLoggingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if FLUSHING.with(|f| f.get()) {
            return;
        }
        let meta = event.metadata();
        if SKIPPED_TARGETS.iter().any(|t| meta.target().starts_with(t)) {
            return;
        }

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let mut payload = visitor.fields;
        payload.insert("target".into(), Value::from(meta.target()));

        self.sink.push(json!({
            "severity": severity(meta.level()),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "jsonPayload": payload,
        }));
    }
}

fn severity(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG | Level::TRACE => "DEBUG",
    }
}

#[derive(Default)]
struct JsonVisitor {
    fields: Map<String, Value>,
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), Value::from(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tracing_subscriber::layer::SubscriberExt;

    fn config(endpoint: String, batch_size: usize) -> CloudLoggingConfig {
        CloudLoggingConfig {
            project_id: "proj".into(),
            log_name: "attack_data_pipeline".into(),
            endpoint,
            access_token: None,
            batch_size,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_events_are_batched_and_written() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/entries:write")
            .match_body(Matcher::PartialJson(json!({
                "logName": "projects/proj/logs/attack_data_pipeline",
                "resource": { "type": "global" },
            })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create();

        let sink = CloudLogSink::new(config(format!("{}/entries:write", server.url()), 10));
        let subscriber = tracing_subscriber::registry().with(CloudLoggingLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(batch_size = 3, "Starting batch processing");
            tracing::warn!(index = 1, "Record validation failed");
        });

        assert_eq!(sink.pending(), 2);
        sink.flush();
        assert_eq!(sink.pending(), 0);
        mock.assert();
    }

    #[test]
    fn test_flush_failure_is_swallowed() {
        let sink = CloudLogSink::new(config("http://127.0.0.1:1/entries:write".into(), 10));
        sink.push(json!({ "severity": "INFO" }));
        sink.flush();
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn test_visitor_captures_fields() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/w")
            .match_body(Matcher::PartialJson(json!({
                "entries": [{
                    "severity": "WARNING",
                    "jsonPayload": { "message": "Prediction failed", "index": 4, "retry": false }
                }]
            })))
            .with_status(200)
            .create();

        let sink = CloudLogSink::new(config(format!("{}/w", server.url()), 1));
        let subscriber = tracing_subscriber::registry().with(CloudLoggingLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(index = 4, retry = false, "Prediction failed");
        });

        mock.assert();
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity(&Level::WARN), "WARNING");
        assert_eq!(severity(&Level::TRACE), "DEBUG");
    }
}
