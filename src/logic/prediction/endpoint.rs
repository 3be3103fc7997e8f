//! Scoring Endpoint
//!
//! Online prediction over HTTP: `{"instances": [[..]]}` in,
//! `{"predictions": [..]}` out. Matches both Vertex AI `:predict` and the
//! HTTP function fronting the model.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::error::PredictionError;

pub trait ScoringEndpoint: Send {
    /// Endpoint address reported on results
    fn url(&self) -> &str;

    /// Score a batch of feature vectors
    fn predict(&self, instances: &[Vec<f64>]) -> Result<Vec<Value>, PredictionError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: &'a [Vec<f64>],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<Value>>,
}

pub struct HttpScoringEndpoint {
    url: String,
    access_token: Option<String>,
    agent: ureq::Agent,
}

impl HttpScoringEndpoint {
    pub fn new(url: impl Into<String>, access_token: Option<String>, timeout_seconds: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .build();

        Self {
            url: url.into(),
            access_token,
            agent,
        }
    }
}

impl ScoringEndpoint for HttpScoringEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    fn predict(&self, instances: &[Vec<f64>]) -> Result<Vec<Value>, PredictionError> {
        let body = serde_json::to_string(&PredictRequest { instances })
            .map_err(|e| PredictionError::MalformedResponse(e.to_string()))?;

        let mut request = self.agent.post(&self.url).set("Content-Type", "application/json");
        if let Some(token) = &self.access_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request.send_string(&body)?;
        let text = response
            .into_string()
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let parsed: PredictResponse = serde_json::from_str(&text)
            .map_err(|e| PredictionError::MalformedResponse(e.to_string()))?;

        match parsed.predictions {
            Some(p) if !p.is_empty() => Ok(p),
            Some(_) => Err(PredictionError::MalformedResponse("empty 'predictions'".into())),
            None => Err(PredictionError::MalformedResponse("missing 'predictions'".into())),
        }
    }
}
