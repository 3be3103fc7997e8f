//! Logic Module - Pipeline & Tooling
//!
//! - `record/` - raw input normalization (storage + prediction shapes)
//! - `storage/` - entity store backends (Datastore, SQLite, memory)
//! - `prediction/` - scoring endpoint client and Pub/Sub publisher
//! - `pipeline/` - per-item batch orchestration
//! - `log_parser`, `splunk/` - offline dataset and query tooling

pub mod config;
pub mod error;
pub mod ingest;
pub mod journal;
pub mod logging;

pub mod pipeline;
pub mod prediction;
pub mod record;
pub mod storage;

pub mod log_parser;
pub mod splunk;
