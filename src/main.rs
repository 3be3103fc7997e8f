//! Attack Data Pipeline - Main Entry Point
//!
//! ```text
//! input file ──► ingest ──► DataPipeline ──► EntityStore (Datastore / SQLite)
//!                               │
//!                               └──► ScoringEndpoint ──► Pub/Sub
//! ```

mod cli;
mod constants;
mod logic;

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;

use cli::{Cli, Commands, ProcessArgs, StoreArgs};
use logic::config::{PipelineConfig, PredictionConfig, StoreBackend};
use logic::error::PipelineResult;
use logic::journal::{self, Journal};
use logic::logging::{self, CloudLoggingConfig, LoggingOptions};
use logic::pipeline::types::BatchReport;
use logic::pipeline::DataPipeline;
use logic::prediction::{HttpScoringEndpoint, PredictionClient, PubSubPublisher};
use logic::storage::{DatastoreConfig, DatastoreStore, EntityStore, MemoryStore, SqliteStore, StorageWriter};
use logic::{ingest, log_parser, splunk};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _log_guard = logging::init(&LoggingOptions {
        level: cli.log_level.clone(),
        json: cli.log_json,
        cloud: cli.cloud_logging.as_deref().map(CloudLoggingConfig::new),
    })
    .context("Failed to initialize logging")?;

    tracing::debug!(version = constants::APP_VERSION, "{} starting", constants::APP_NAME);

    match cli.command {
        Commands::Process(args) => run_process(args),
        Commands::ParseLogs { input_dir, output_file } => {
            let count = log_parser::write_parsed(&input_dir, &output_file)
                .with_context(|| format!("Failed to parse logs under {}", input_dir.display()))?;
            println!("Parsed {} log files into {}", count, output_file.display());
            Ok(())
        }
        Commands::Queries { output, honeypot_filter } => {
            let report = splunk::render_report(chrono::Local::now(), honeypot_filter);
            match output {
                Some(path) => {
                    std::fs::write(&path, report).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Saved to: {}", path.display());
                }
                None => print!("{}", report),
            }
            Ok(())
        }
        Commands::Check(store) => run_check(&store),
        Commands::Journal { dir, problems_only } => run_journal(&dir, problems_only),
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_process(args: ProcessArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.store)?;
    if let Some(path) = &args.prediction_config {
        config.prediction = PredictionConfig::from_file(path)?;
    }
    if args.no_prediction {
        config.prediction.enabled = false;
    }
    if let Some(policy) = args.policy {
        config.secondary_failure_policy = policy;
    }
    if args.journal_dir.is_some() {
        config.journal_dir = args.journal_dir.clone();
    }
    config.validate().context("Invalid pipeline configuration")?;

    let mut pipeline = build_pipeline(&config).context("Failed to initialize pipeline")?;
    let records = ingest::load_records(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let report = pipeline.process_batch(&records);

    if let Err(e) = pipeline.close() {
        tracing::warn!(error = %e, "Store did not close cleanly");
    }

    for line in report_lines(&report) {
        println!("{}", line);
    }
    Ok(())
}

fn report_lines(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![
        format!("Processed {} items", report.summary.total),
        format!("Batch {}: {}", report.run_id, report.summary),
    ];
    for outcome in report.outcomes.iter().filter(|o| !o.success) {
        lines.push(format!(
            "  item {}: {}",
            outcome.index,
            outcome.error.as_deref().unwrap_or("unknown error")
        ));
    }
    lines
}

fn run_check(store: &StoreArgs) -> anyhow::Result<()> {
    let config = load_config(store)?;
    config.validate().context("Invalid pipeline configuration")?;

    let writer = build_writer(&config).context("Failed to open store")?;
    let result = writer.health_check();
    if let Err(e) = writer.close() {
        tracing::warn!(error = %e, "Store did not close cleanly");
    }

    match result {
        Ok(()) => {
            println!("{} store is reachable ({})", writer.backend(), writer.collection());
            Ok(())
        }
        Err(e) => bail!("{} store check failed: {}", writer.backend(), e),
    }
}

fn run_journal(dir: &Path, problems_only: bool) -> anyhow::Result<()> {
    let files = journal::list_journal_files(dir)
        .with_context(|| format!("Failed to list journal files in {}", dir.display()))?;
    if files.is_empty() {
        println!("No journal files in {}", dir.display());
        return Ok(());
    }

    for file in files {
        let entries = journal::read_entries(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!("{} ({} entries)", file.display(), entries.len());

        for entry in entries {
            let outcome = &entry.outcome;
            if problems_only && outcome.success && outcome.warnings.is_empty() {
                continue;
            }
            let status = if outcome.success { "ok" } else { "FAILED" };
            println!(
                "  {} run={} item={} {} stage={:?}{}",
                entry.recorded_at,
                entry.run_id,
                outcome.index,
                status,
                outcome.stage,
                outcome.error.as_deref().map(|e| format!(" error={}", e)).unwrap_or_default()
            );
            for warning in &outcome.warnings {
                println!("    warning: {}", warning);
            }
        }
    }
    Ok(())
}

// ============================================================================
// WIRING
// ============================================================================

fn load_config(store: &StoreArgs) -> PipelineResult<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;

    if let Some(project_id) = &store.project_id {
        config.project_id = project_id.clone();
        config.prediction.project_id = project_id.clone();
    }
    if let Some(kind) = &store.datastore_kind {
        config.collection = kind.clone();
    }
    if let Some(namespace) = &store.datastore_namespace {
        config.namespace = Some(namespace.clone()).filter(|n| !n.is_empty());
    }
    if let Some(backend) = store.backend {
        config.backend = backend;
    }
    if let Some(path) = &store.sqlite_path {
        config.sqlite_path = path.clone();
    }

    Ok(config)
}

fn build_writer(config: &PipelineConfig) -> PipelineResult<StorageWriter> {
    let store: Box<dyn EntityStore> = match config.backend {
        StoreBackend::Datastore => Box::new(DatastoreStore::new(DatastoreConfig {
            project_id: config.project_id.clone(),
            base_url: config.datastore_url.clone(),
            access_token: config.access_token.clone(),
            timeout_seconds: config.http_timeout_secs,
        })),
        StoreBackend::Sqlite => Box::new(SqliteStore::open(&config.sqlite_path)?),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    };

    Ok(StorageWriter::new(store, config.collection.clone(), config.namespace.clone()))
}

fn build_predictor(config: &PipelineConfig) -> Option<PredictionClient> {
    let prediction = &config.prediction;
    if !prediction.enabled {
        return None;
    }

    let endpoint = HttpScoringEndpoint::new(
        prediction.endpoint_url(),
        config.access_token.clone(),
        config.http_timeout_secs,
    );
    let mut client = PredictionClient::new(Box::new(endpoint), prediction.schema(), prediction.model_id.clone());

    if let Some(topic) = &prediction.pubsub_topic {
        let publisher = PubSubPublisher::new(
            config.pubsub_url.clone(),
            prediction.project_id.clone(),
            config.access_token.clone(),
            config.http_timeout_secs,
        );
        client = client.with_publisher(Box::new(publisher), topic.clone());
    }

    Some(client)
}

/// Wire the pipeline, failing fast when the store is unreachable
fn build_pipeline(config: &PipelineConfig) -> PipelineResult<DataPipeline> {
    let writer = build_writer(config)?;
    if let Err(e) = writer.health_check() {
        tracing::error!(backend = writer.backend(), error = %e, "Store health check failed");
        if let Err(close_err) = writer.close() {
            tracing::warn!(error = %close_err, "Store did not close cleanly");
        }
        return Err(e.into());
    }
    let mut pipeline = DataPipeline::new(writer).with_policy(config.secondary_failure_policy);

    if let Some(client) = build_predictor(config) {
        pipeline = pipeline.with_predictor(client);
    }
    if let Some(dir) = &config.journal_dir {
        pipeline = pipeline.with_journal(Journal::new(dir)?);
    }

    tracing::debug!(
        policy = %config.secondary_failure_policy,
        journal = config.journal_dir.is_some(),
        "Pipeline wiring complete"
    );
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::{PipelineError, StorageError};
    use crate::logic::journal::JournalEntry;
    use crate::logic::pipeline::{ItemOutcome, SecondaryFailurePolicy};
    use crate::logic::record::RawRecord;

    fn config(backend: StoreBackend) -> PipelineConfig {
        PipelineConfig {
            project_id: "proj".into(),
            collection: "NetworkEvent".into(),
            namespace: None,
            backend,
            datastore_url: "http://127.0.0.1:1".into(),
            sqlite_path: "unused.db".into(),
            access_token: None,
            pubsub_url: "http://127.0.0.1:1".into(),
            http_timeout_secs: 1,
            secondary_failure_policy: SecondaryFailurePolicy::default(),
            journal_dir: None,
            prediction: PredictionConfig {
                enabled: false,
                ..PredictionConfig::default()
            },
        }
    }

    #[test]
    fn test_build_pipeline_rejects_unreachable_store() {
        match build_pipeline(&config(StoreBackend::Datastore)) {
            Err(PipelineError::Storage(StorageError::Transport(_))) => {}
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("pipeline built against an unreachable store"),
        }
    }

    #[test]
    fn test_build_pipeline_with_reachable_store() {
        let mut server = mockito::Server::new();
        let lookup = server
            .mock("POST", "/projects/proj:lookup")
            .with_status(200)
            .with_body(r#"{"missing":[]}"#)
            .expect_at_least(1)
            .create();

        let mut cfg = config(StoreBackend::Datastore);
        cfg.datastore_url = server.url();
        assert!(build_pipeline(&cfg).is_ok());
        lookup.assert();

        assert!(build_pipeline(&config(StoreBackend::Memory)).is_ok());
    }

    #[test]
    fn test_report_lines_count_every_item() {
        let mut stored = ItemOutcome::pending(0);
        stored.success = true;
        let mut rejected = ItemOutcome::pending(1);
        rejected.error = Some("Missing required fields: protocol".into());

        let report = BatchReport::new(uuid::Uuid::new_v4(), vec![stored, rejected]);
        let lines = report_lines(&report);

        assert_eq!(lines[0], "Processed 2 items");
        assert_eq!(lines[1], format!("Batch {}: 1/2 successful, 1 failed, 0 predicted (50.0%)", report.run_id));
        assert_eq!(lines[2], "  item 1: Missing required fields: protocol");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_journal_command_reads_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(StoreBackend::Memory);
        cfg.journal_dir = Some(dir.path().to_path_buf());
        let mut pipeline = build_pipeline(&cfg).unwrap();
        let mut record = RawRecord::new();
        record.insert("protocol", "udp");
        pipeline.process_batch(&[record]);

        let files = journal::list_journal_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        let entries: Vec<JournalEntry> = journal::read_entries(&files[0]).unwrap();
        assert_eq!(entries.len(), 1);

        assert!(run_journal(dir.path(), false).is_ok());
        assert!(run_journal(dir.path(), true).is_ok());
    }

    #[test]
    fn test_journal_command_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(journal::list_journal_files(dir.path()).unwrap().is_empty());
        assert!(run_journal(dir.path(), true).is_ok());
    }
}
