//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value here can be overridden through the environment (see `get_*` helpers)
//! and most of them again through CLI flags.

use std::path::PathBuf;

/// Default Google Cloud project
pub const DEFAULT_PROJECT_ID: &str = "attack-data-pipeline";

/// Default Datastore kind records are stored under
pub const DEFAULT_DATASTORE_KIND: &str = "NetworkEvent";

/// Datastore REST base URL (production)
pub const DEFAULT_DATASTORE_URL: &str = "https://datastore.googleapis.com/v1";

/// Pub/Sub REST base URL (production)
pub const DEFAULT_PUBSUB_URL: &str = "https://pubsub.googleapis.com/v1";

/// Cloud Logging write endpoint
pub const DEFAULT_CLOUD_LOGGING_URL: &str = "https://logging.googleapis.com/v2/entries:write";

/// Default Cloud Logging log name
pub const DEFAULT_CLOUD_LOG_NAME: &str = "attack_data_pipeline";

/// Default scoring endpoint region
pub const DEFAULT_REGION: &str = "us-central1";

/// Default model id reported on prediction results
pub const DEFAULT_MODEL_ID: &str = "attack-detection-model";

/// Model features sent to the scoring endpoint, in order
pub const DEFAULT_FEATURES: [&str; 4] = ["feat1", "feat2", "feat3", "feat4"];

/// Value of the `source` tag on every stored record
pub const SOURCE_TAG: &str = "data_pipeline";

/// HTTP timeout for every outbound call (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Progress log interval (items)
pub const PROGRESS_LOG_INTERVAL: usize = 10;

/// Datastore rejects indexed string values above this size (bytes)
pub const DATASTORE_MAX_INDEXED_BYTES: usize = 1500;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "attack-pipeline";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get project id from environment or use default
pub fn get_project_id() -> String {
    std::env::var("GCP_PROJECT_ID")
        .unwrap_or_else(|_| DEFAULT_PROJECT_ID.to_string())
}

/// Get Datastore kind from environment or use default
pub fn get_datastore_kind() -> String {
    std::env::var("DATASTORE_KIND")
        .unwrap_or_else(|_| DEFAULT_DATASTORE_KIND.to_string())
}

/// Get Datastore namespace (none when unset or empty)
pub fn get_datastore_namespace() -> Option<String> {
    non_empty_var("DATASTORE_NAMESPACE")
}

/// Get Datastore base URL.
///
/// `DATASTORE_URL` wins, then `DATASTORE_EMULATOR_HOST` (host:port of a local emulator).
pub fn get_datastore_url() -> String {
    if let Some(url) = non_empty_var("DATASTORE_URL") {
        return url;
    }
    match non_empty_var("DATASTORE_EMULATOR_HOST") {
        Some(host) => format!("http://{}/v1", host),
        None => DEFAULT_DATASTORE_URL.to_string(),
    }
}

/// Get Pub/Sub base URL from environment or use default
pub fn get_pubsub_url() -> String {
    non_empty_var("PUBSUB_URL").unwrap_or_else(|| DEFAULT_PUBSUB_URL.to_string())
}

/// OAuth bearer token for Google APIs
pub fn get_access_token() -> Option<String> {
    non_empty_var("GCP_ACCESS_TOKEN")
}

/// Get HTTP timeout from environment or use default
pub fn get_http_timeout_secs() -> u64 {
    std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
}

/// Default SQLite database location for the offline store
pub fn get_sqlite_path() -> PathBuf {
    non_empty_var("SQLITE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir().join("pipeline.db"))
}

/// Journal directory (journal disabled when unset)
pub fn get_journal_dir() -> Option<PathBuf> {
    non_empty_var("JOURNAL_DIR").map(PathBuf::from)
}

/// Check if prediction is enabled
pub fn is_prediction_enabled() -> bool {
    std::env::var("PREDICTION_ENABLED")
        .map(|s| s.to_lowercase() == "true" || s == "1")
        .unwrap_or(false)
}

/// Base data directory for local artifacts
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Read an env var, treating empty values as unset
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
