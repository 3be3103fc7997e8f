use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::error::{PredictionError, PublishError};

/// Scoring output for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// First entry of the endpoint's `predictions`
    pub prediction: Value,
    pub model: String,
    pub endpoint: String,
    pub timestamp: String,
    /// Feature vector that was sent
    pub features: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Prediction plus the outcome of the optional publish step
#[derive(Debug)]
pub struct Scored {
    pub result: PredictionResult,
    /// Set when a topic is configured and publishing failed
    pub publish_error: Option<PublishError>,
}

/// Ordered list of model inputs
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list, e.g. `feat1,feat2`
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Build the feature vector, naming every input the record lacks
    pub fn vector(&self, record: &crate::logic::record::PredictionRecord) -> Result<Vec<f64>, PredictionError> {
        let mut values = Vec::with_capacity(self.names.len());
        let mut missing = Vec::new();

        for name in &self.names {
            match record.feature(name) {
                Some(v) => values.push(v),
                None => missing.push(name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(PredictionError::InvalidFeatures(missing));
        }
        Ok(values)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_FEATURES)
    }
}
