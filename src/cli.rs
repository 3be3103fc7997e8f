use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logic::config::StoreBackend;
use crate::logic::pipeline::SecondaryFailurePolicy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level for this tool (trace, debug, info, warn, error); RUST_LOG when unset
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also ship logs to Cloud Logging in this project
    #[arg(long, global = true, env = "CLOUD_LOGGING_PROJECT")]
    pub cloud_logging: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a batch of records through the pipeline
    Process(ProcessArgs),
    /// Extract model features from a directory of .log files
    ParseLogs {
        #[arg(long, default_value = "datasets")]
        input_dir: PathBuf,
        #[arg(long, default_value = "all_parsed_data.json")]
        output_file: PathBuf,
    },
    /// Render the Splunk security query report
    Queries {
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Exclude events to or from honeypot hosts
        #[arg(long)]
        honeypot_filter: bool,
    },
    /// Check that the configured store is reachable
    Check(StoreArgs),
    /// Show outcomes recorded in the journal
    Journal {
        /// Journal directory (defaults to JOURNAL_DIR)
        #[arg(long, env = "JOURNAL_DIR")]
        dir: PathBuf,
        /// Only show failed items and items with warnings
        #[arg(long)]
        problems_only: bool,
    },
}

/// Store overrides shared by `process` and `check`
#[derive(Parser, Debug, Default)]
pub struct StoreArgs {
    #[arg(long)]
    pub project_id: Option<String>,

    /// Datastore kind (collection)
    #[arg(long)]
    pub datastore_kind: Option<String>,

    #[arg(long)]
    pub datastore_namespace: Option<String>,

    /// datastore, sqlite or memory
    #[arg(long)]
    pub backend: Option<StoreBackend>,

    #[arg(long)]
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Input batch (.json, .jsonl or .csv)
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Prediction settings file (JSON); overrides PREDICTION_* variables
    #[arg(long)]
    pub prediction_config: Option<PathBuf>,

    /// Skip the scoring step
    #[arg(long)]
    pub no_prediction: bool,

    /// log-only or report
    #[arg(long)]
    pub policy: Option<SecondaryFailurePolicy>,

    /// Append every outcome to a JSONL journal here
    #[arg(long)]
    pub journal_dir: Option<PathBuf>,
}
