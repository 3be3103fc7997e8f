//! Input Loader
//!
//! Reads a batch of RawRecords from disk. Format is picked by extension:
//! - `.json`  - array of objects
//! - `.jsonl` - one object per line
//! - `.csv`   - header row, every cell kept as a string

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;

use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::record::RawRecord;

pub fn load_records(path: &Path) -> PipelineResult<Vec<RawRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let records = match ext.as_str() {
        "json" => load_json(path)?,
        "jsonl" | "ndjson" => load_jsonl(path)?,
        "csv" => load_csv(path)?,
        _ => {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{} (expected .json, .jsonl or .csv)",
                path.display()
            )))
        }
    };

    tracing::info!(path = %path.display(), records = records.len(), "Loaded input records");
    Ok(records)
}

fn into_record(value: Value, position: usize) -> PipelineResult<RawRecord> {
    match value {
        Value::Object(map) => Ok(RawRecord::from(map)),
        other => Err(PipelineError::InvalidInput(format!(
            "record {} is not an object: {}",
            position, other
        ))),
    }
}

fn load_json(path: &Path) -> PipelineResult<Vec<RawRecord>> {
    let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| into_record(v, i))
            .collect(),
        _ => Err(PipelineError::InvalidInput(format!(
            "{} must contain a JSON array of records",
            path.display()
        ))),
    }
}

fn load_jsonl(path: &Path) -> PipelineResult<Vec<RawRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)?;
        records.push(into_record(value, records.len())?);
    }

    Ok(records)
}

fn load_csv(path: &Path) -> PipelineResult<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let mut record = RawRecord::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            record.insert(header, cell);
        }
        records.push(record);
    }

    Ok(records)
}
