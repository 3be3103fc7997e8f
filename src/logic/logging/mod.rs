//! Logging
//!
//! `tracing` subscriber setup: env filter, local fmt layer (text or JSON) and
//! an optional Cloud Logging layer. Keep the returned guard alive until exit
//! so buffered cloud entries get flushed.

pub mod cloud;

use std::sync::Arc;

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use cloud::{CloudLogSink, CloudLoggingConfig, CloudLoggingLayer};

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Level for this crate (e.g. `debug`); `RUST_LOG` is used when unset
    pub level: Option<String>,
    /// Emit JSON lines instead of text
    pub json: bool,
    pub cloud: Option<CloudLoggingConfig>,
}

/// Flushes the cloud sink on drop
pub struct LogGuard {
    sink: Option<Arc<CloudLogSink>>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(sink) = &self.sink {
            sink.flush();
        }
    }
}

fn default_filter(level: &str) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

pub fn init(options: &LoggingOptions) -> Result<LogGuard, TryInitError> {
    let filter = match &options.level {
        Some(level) => EnvFilter::new(default_filter(level)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter("info"))),
    };

    let sink = options.cloud.clone().map(CloudLogSink::new);

    let json_layer = options.json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!options.json).then(|| fmt::layer().with_writer(std::io::stderr));
    let cloud_layer = sink.clone().map(CloudLoggingLayer::new);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(cloud_layer)
        .try_init()?;

    if let Some(cloud) = &options.cloud {
        tracing::info!(project_id = %cloud.project_id, log_name = %cloud.log_name, "Cloud Logging enabled");
    }

    Ok(LogGuard { sink })
}
