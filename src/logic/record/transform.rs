//! Record Transformer
//!
//! Normalizes one RawRecord into its storage and prediction views.
//! Pure apart from reading the clock.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::types::{PredictionRecord, RawRecord, StorageRecord, REQUIRED_FIELDS, RESERVED_FIELDS};
use crate::constants::SOURCE_TAG;
use crate::logic::error::ValidationError;

/// Transform using the current time for defaults
pub fn transform(raw: &RawRecord) -> Result<(StorageRecord, PredictionRecord), ValidationError> {
    transform_at(raw, Utc::now())
}

/// Transform with an explicit clock reading
pub fn transform_at(
    raw: &RawRecord,
    now: DateTime<Utc>,
) -> Result<(StorageRecord, PredictionRecord), ValidationError> {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| raw.get(f).is_none())
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    // Presence checked above
    let source_ip = text_of(raw.get("source_ip").unwrap_or(&Value::Null));
    let destination_ip = text_of(raw.get("destination_ip").unwrap_or(&Value::Null));
    let protocol = text_of(raw.get("protocol").unwrap_or(&Value::Null)).to_uppercase();
    let payload_size = parse_integer("payload_size", raw.get("payload_size"))?;
    let timestamp = normalize_timestamp(raw.get("timestamp"), now)?;
    let threat_score = match raw.get("threat_score") {
        Some(v) => Some(parse_float("threat_score", v)?),
        None => None,
    };

    let mut extra = Map::new();
    for (k, v) in &raw.0 {
        if v.is_null() || RESERVED_FIELDS.contains(&k.as_str()) {
            continue;
        }
        extra.insert(k.clone(), v.clone());
    }

    let features = extra
        .iter()
        .filter(|(k, _)| k.as_str() != "threat_score")
        .filter_map(|(k, v)| numeric(v).map(|n| (k.clone(), n)))
        .collect();

    let storage = StorageRecord {
        timestamp: timestamp.clone(),
        source_ip: source_ip.clone(),
        destination_ip: destination_ip.clone(),
        protocol: protocol.clone(),
        payload_size,
        processed_at: now.to_rfc3339_opts(SecondsFormat::Micros, true),
        source: SOURCE_TAG.to_string(),
        raw_data: raw.to_json_string(),
        extra,
    };

    let prediction = PredictionRecord {
        timestamp,
        source_ip,
        destination_ip,
        protocol,
        payload_size,
        threat_score,
        features,
    };

    Ok((storage, prediction))
}

// ============================================================================
// COERCION
// ============================================================================

/// Strings verbatim, everything else as its JSON text
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn parse_integer(field: &str, value: Option<&Value>) -> Result<i64, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                    _ => Err(invalid("expected an integer")),
                }
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(&format!("'{}' is not an integer", s))),
        Some(_) => Err(invalid("expected an integer")),
        None => Err(ValidationError::MissingFields(vec![field.to_string()])),
    }
}

fn parse_float(field: &str, value: &Value) -> Result<f64, ValidationError> {
    numeric(value).ok_or_else(|| ValidationError::InvalidField {
        field: field.to_string(),
        reason: format!("'{}' is not a number", text_of(value)),
    })
}

/// Non-empty strings verbatim, numbers as Unix seconds, otherwise now
fn normalize_timestamp(value: Option<&Value>, now: DateTime<Utc>) -> Result<String, ValidationError> {
    let now_text = || now.to_rfc3339_opts(SecondsFormat::Micros, true);

    match value {
        None => Ok(now_text()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(now_text()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => {
            let secs = n.as_f64().unwrap_or(f64::NAN);
            let whole = secs.trunc();
            let nanos = ((secs - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
            if !secs.is_finite() || secs < 0.0 {
                return Err(ValidationError::InvalidField {
                    field: "timestamp".into(),
                    reason: format!("{} is not a valid Unix time", n),
                });
            }
            DateTime::<Utc>::from_timestamp(whole as i64, nanos)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .ok_or_else(|| ValidationError::InvalidField {
                    field: "timestamp".into(),
                    reason: format!("{} is out of range", n),
                })
        }
        Some(other) => Err(ValidationError::InvalidField {
            field: "timestamp".into(),
            reason: format!("unsupported value {}", other),
        }),
    }
}
