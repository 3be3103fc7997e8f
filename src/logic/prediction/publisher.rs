//! Pub/Sub Publisher
//!
//! `POST {base}/projects/{project}/topics/{topic}:publish` with base64 data.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;

use crate::logic::error::PublishError;

pub trait Publisher: Send {
    /// Publish one message, returning the bus-assigned message id
    fn publish(&self, topic: &str, data: &[u8]) -> Result<String, PublishError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

pub struct PubSubPublisher {
    base_url: String,
    project_id: String,
    access_token: Option<String>,
    agent: ureq::Agent,
}

impl PubSubPublisher {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        access_token: Option<String>,
        timeout_seconds: u64,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .build();

        Self {
            base_url: base_url.into(),
            project_id: project_id.into(),
            access_token,
            agent,
        }
    }

    /// Full resource path, accepting bare topic ids or `projects/../topics/..`
    fn topic_path(&self, topic: &str) -> String {
        if topic.starts_with("projects/") {
            topic.to_string()
        } else {
            format!("projects/{}/topics/{}", self.project_id, topic)
        }
    }
}

impl Publisher for PubSubPublisher {
    fn publish(&self, topic: &str, data: &[u8]) -> Result<String, PublishError> {
        let url = format!(
            "{}/{}:publish",
            self.base_url.trim_end_matches('/'),
            self.topic_path(topic)
        );
        let body = json!({
            "messages": [{ "data": STANDARD.encode(data) }],
        });

        let mut request = self.agent.post(&url).set("Content-Type", "application/json");
        if let Some(token) = &self.access_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request.send_string(&body.to_string())?;
        let text = response
            .into_string()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let parsed: PublishResponse = serde_json::from_str(&text)
            .map_err(|e| PublishError::MalformedResponse(e.to_string()))?;

        let message_id = parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::MalformedResponse("no message id returned".into()))?;

        tracing::info!(topic = %topic, message_id = %message_id, "Published message to Pub/Sub");
        Ok(message_id)
    }
}
