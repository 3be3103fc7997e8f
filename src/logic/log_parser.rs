//! Log Feature Parser
//!
//! Walks a directory of `.log` captures and extracts the four model features
//! plus a label derived from the file's location.
//!
//! | feature | meaning                                   | source         |
//! |---------|-------------------------------------------|----------------|
//! | feat1   | suspicious process seen (0/1)             | fgdump, sysmon |
//! | feat2   | Token Elevation Type                      | fgdump         |
//! | feat3   | Sysmon EventID                            | sysmon         |
//! | feat4   | longest PowerShell ScriptBlockText        | powershell     |

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::logic::error::PipelineResult;

static FGDUMP_PROCESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)fgdump.exe").expect("valid regex"));
static TOKEN_ELEVATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Token Elevation Type:\s+%%(\d+)").expect("valid regex"));
static SYSMON_EVENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"<EventID>(\d+)</EventID>").expect("valid regex"));
static SYSMON_SUSPICIOUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)mimikatz.exe|powershell.exe").expect("valid regex"));
static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"ScriptBlockText=(.*)").expect("valid regex"));

/// Features extracted from one log file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFeatures {
    pub feat1: i64,
    pub feat2: i64,
    pub feat3: i64,
    pub feat4: i64,
    /// 1 = attack, 0 = benign
    pub target: u8,
    pub log_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Fgdump,
    Sysmon,
    Powershell,
    Other,
}

impl LogKind {
    /// Pick the parser from the file name (first match wins)
    pub fn from_file_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("fgdump") {
            Self::Fgdump
        } else if name.contains("sysmon") {
            Self::Sysmon
        } else if name.contains("powershell") {
            Self::Powershell
        } else {
            Self::Other
        }
    }
}

/// Label from the dataset folder layout
pub fn target_label(log_path: &str) -> u8 {
    let path = log_path.to_lowercase();
    if path.contains("attack_techniques") || path.contains("malware") {
        return 1;
    }
    if path.contains("honeypots") {
        return 0;
    }
    if path.contains("suspicious_behaviour") {
        return 1;
    }
    0
}

fn captured_int(re: &Regex, content: &str) -> Option<i64> {
    re.captures(content)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn parse_fgdump(content: &str, features: &mut LogFeatures) {
    if FGDUMP_PROCESS.is_match(content) {
        features.feat1 = 1;
    }
    if let Some(v) = captured_int(&TOKEN_ELEVATION, content) {
        features.feat2 = v;
    }
}

pub fn parse_sysmon(content: &str, features: &mut LogFeatures) {
    if let Some(v) = captured_int(&SYSMON_EVENT_ID, content) {
        features.feat3 = v;
    }
    if SYSMON_SUSPICIOUS.is_match(content) {
        features.feat1 = 1;
    }
}

pub fn parse_powershell(content: &str, features: &mut LogFeatures) {
    let longest = SCRIPT_BLOCK
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().chars().count())
        .max();
    if let Some(len) = longest {
        features.feat4 = len as i64;
    }
}

/// Parse one file. Unreadable bytes are replaced, not rejected.
pub fn parse_log_file(path: &Path) -> std::io::Result<LogFeatures> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let log_path = path.to_string_lossy().to_string();

    let mut features = LogFeatures {
        target: target_label(&log_path),
        log_path,
        ..Default::default()
    };

    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    match LogKind::from_file_name(&name) {
        LogKind::Fgdump => parse_fgdump(&content, &mut features),
        LogKind::Sysmon => parse_sysmon(&content, &mut features),
        LogKind::Powershell => parse_powershell(&content, &mut features),
        LogKind::Other => {}
    }

    Ok(features)
}

/// Parse every `.log` file under `dir`. Unreadable files are logged and skipped.
pub fn parse_directory(dir: &Path) -> Vec<LogFeatures> {
    let mut all = Vec::new();

    let entries = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                None
            }
        });

    for entry in entries {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "log") {
            continue;
        }

        tracing::debug!(path = %path.display(), "Parsing log file");
        match parse_log_file(path) {
            Ok(features) => all.push(features),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not read log file"),
        }
    }

    tracing::info!(dir = %dir.display(), files = all.len(), "Parsed log files");
    all
}

/// Parse `dir` and write the results as pretty JSON
pub fn write_parsed(dir: &Path, output: &Path) -> PipelineResult<usize> {
    let all = parse_directory(dir);
    let json = serde_json::to_string_pretty(&all)?;
    std::fs::write(output, json)?;
    Ok(all.len())
}
