//! Configuration
//!
//! `PipelineConfig::from_env()` reads the environment (after `.env` is loaded)
//! with defaults from `constants`. CLI flags are applied on top by `main`.
//! The prediction section may also come from a JSON file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::constants;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::pipeline::SecondaryFailurePolicy;
use crate::logic::prediction::FeatureSchema;

/// Which `EntityStore` backs the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Datastore,
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "datastore" => Ok(Self::Datastore),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{}' (expected datastore|sqlite|memory)", other)),
        }
    }
}

// ============================================================================
// PREDICTION CONFIG
// ============================================================================

/// Scoring + publish settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub enabled: bool,

    /// Project hosting the endpoint and topic
    pub project_id: String,

    pub region: String,

    pub model_id: String,

    /// Defaults to `{model_id}-endpoint`
    pub endpoint_id: Option<String>,

    /// Full `:predict` URL; overrides the Vertex AI URL built from the ids
    pub endpoint_url: Option<String>,

    /// Ordered model inputs
    pub features: Vec<String>,

    /// Pub/Sub topic for results (publishing disabled when unset)
    pub pubsub_topic: Option<String>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: constants::get_project_id(),
            region: constants::DEFAULT_REGION.to_string(),
            model_id: constants::DEFAULT_MODEL_ID.to_string(),
            endpoint_id: None,
            endpoint_url: None,
            features: constants::DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
            pubsub_topic: None,
        }
    }
}

impl PredictionConfig {
    /// Load prediction configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: constants::is_prediction_enabled(),
            project_id: defaults.project_id,
            region: constants::non_empty_var("PREDICTION_REGION").unwrap_or(defaults.region),
            model_id: constants::non_empty_var("PREDICTION_MODEL_ID").unwrap_or(defaults.model_id),
            endpoint_id: constants::non_empty_var("PREDICTION_ENDPOINT_ID"),
            endpoint_url: constants::non_empty_var("PREDICTION_ENDPOINT_URL"),
            features: constants::non_empty_var("PREDICTION_FEATURES")
                .map(|list| FeatureSchema::parse(&list).names().to_vec())
                .unwrap_or(defaults.features),
            pubsub_topic: constants::non_empty_var("PUBSUB_TOPIC"),
        }
    }

    /// Load from a JSON file. Unknown keys (credentials etc.) are ignored.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn endpoint_id(&self) -> String {
        self.endpoint_id
            .clone()
            .unwrap_or_else(|| format!("{}-endpoint", self.model_id))
    }

    /// Effective scoring URL
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/endpoints/{endpoint}:predict",
                region = self.region,
                project = self.project_id,
                endpoint = self.endpoint_id(),
            ),
        }
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.features.iter().cloned())
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.endpoint_url.is_none() && (self.project_id.is_empty() || self.model_id.is_empty()) {
            return Err(PipelineError::Config(
                "prediction needs either endpoint_url or project_id + model_id".into(),
            ));
        }
        if self.features.is_empty() {
            return Err(PipelineError::Config("prediction feature list is empty".into()));
        }
        Ok(())
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Google Cloud project for Datastore
    pub project_id: String,

    /// Datastore kind records are stored under
    pub collection: String,

    /// Datastore namespace
    pub namespace: Option<String>,

    pub backend: StoreBackend,

    /// Datastore REST base URL (emulator aware)
    pub datastore_url: String,

    /// SQLite file for the `sqlite` backend
    pub sqlite_path: PathBuf,

    /// OAuth bearer token for Google APIs
    pub access_token: Option<String>,

    pub pubsub_url: String,

    pub http_timeout_secs: u64,

    pub secondary_failure_policy: SecondaryFailurePolicy,

    /// Outcome journal directory (disabled when unset)
    pub journal_dir: Option<PathBuf>,

    pub prediction: PredictionConfig,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PipelineResult<Self> {
        let backend = match constants::non_empty_var("STORE_BACKEND") {
            Some(v) => v.parse().map_err(PipelineError::Config)?,
            None => StoreBackend::Datastore,
        };

        let secondary_failure_policy = match constants::non_empty_var("SECONDARY_FAILURE_POLICY") {
            Some(v) => v.parse().map_err(PipelineError::Config)?,
            None => SecondaryFailurePolicy::default(),
        };

        Ok(Self {
            project_id: constants::get_project_id(),
            collection: constants::get_datastore_kind(),
            namespace: constants::get_datastore_namespace(),
            backend,
            datastore_url: constants::get_datastore_url(),
            sqlite_path: constants::get_sqlite_path(),
            access_token: constants::get_access_token(),
            pubsub_url: constants::get_pubsub_url(),
            http_timeout_secs: constants::get_http_timeout_secs(),
            secondary_failure_policy,
            journal_dir: constants::get_journal_dir(),
            prediction: PredictionConfig::from_env(),
        })
    }

    /// Reject configurations that cannot start a run
    pub fn validate(&self) -> PipelineResult<()> {
        if self.collection.trim().is_empty() {
            return Err(PipelineError::Config("collection (Datastore kind) must not be empty".into()));
        }
        if self.backend == StoreBackend::Datastore && self.project_id.trim().is_empty() {
            return Err(PipelineError::Config("project id is required for the datastore backend".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(PipelineError::Config("HTTP timeout must be at least 1 second".into()));
        }
        self.prediction.validate()
    }
}
