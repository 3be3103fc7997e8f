//! Prediction Client
//!
//! Feature extraction, scoring call, optional publish of the result.

use chrono::{SecondsFormat, Utc};

use super::endpoint::ScoringEndpoint;
use super::publisher::Publisher;
use super::types::{FeatureSchema, PredictionResult, Scored};
use crate::logic::error::{PredictionError, PublishError};
use crate::logic::record::PredictionRecord;

pub struct PredictionClient {
    endpoint: Box<dyn ScoringEndpoint>,
    publisher: Option<(Box<dyn Publisher>, String)>,
    schema: FeatureSchema,
    model: String,
}

impl PredictionClient {
    pub fn new(endpoint: Box<dyn ScoringEndpoint>, schema: FeatureSchema, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            publisher: None,
            schema,
            model: model.into(),
        }
    }

    /// Publish every result to `topic`
    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>, topic: impl Into<String>) -> Self {
        self.publisher = Some((publisher, topic.into()));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint.url()
    }

    pub fn topic(&self) -> Option<&str> {
        self.publisher.as_ref().map(|(_, t)| t.as_str())
    }

    /// Score one record.
    ///
    /// A publish failure is carried in `Scored::publish_error` and never
    /// turns into a prediction error.
    pub fn predict(&self, record: &PredictionRecord) -> Result<Scored, PredictionError> {
        let features = self.schema.vector(record)?;
        tracing::debug!(features = ?features, "Sending prediction request");

        let predictions = self.endpoint.predict(std::slice::from_ref(&features))?;
        let prediction = predictions
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::MalformedResponse("empty 'predictions'".into()))?;

        let mut result = PredictionResult {
            prediction,
            model: self.model.clone(),
            endpoint: self.endpoint.url().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            features,
            message_id: None,
        };

        tracing::info!(
            model = %result.model,
            prediction = %result.prediction,
            "Received prediction"
        );

        let publish_error = match &self.publisher {
            Some((publisher, topic)) => match publish(publisher.as_ref(), topic, &result) {
                Ok(id) => {
                    result.message_id = Some(id);
                    None
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "Pub/Sub publish failed (continuing)");
                    Some(e)
                }
            },
            None => None,
        };

        Ok(Scored { result, publish_error })
    }
}

fn publish(publisher: &dyn Publisher, topic: &str, result: &PredictionResult) -> Result<String, PublishError> {
    let payload = serde_json::to_vec(result).map_err(|e| PublishError::MalformedResponse(e.to_string()))?;
    publisher.publish(topic, &payload)
}
