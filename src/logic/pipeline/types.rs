use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::error::ErrorKind;
use crate::logic::prediction::PredictionResult;
use crate::logic::storage::EntityKey;

// ============================================================================
// POLICY
// ============================================================================

/// What to do when a step after storage fails (publish, attach-back)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryFailurePolicy {
    /// Log the failure and move on
    #[default]
    LogOnly,
    /// Log it and also add a warning to the item outcome
    Report,
}

impl FromStr for SecondaryFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" | "log_only" | "log-only" => Ok(Self::LogOnly),
            "report" => Ok(Self::Report),
            other => Err(format!("unknown secondary failure policy '{}' (expected log|report)", other)),
        }
    }
}

impl fmt::Display for SecondaryFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogOnly => write!(f, "log"),
            Self::Report => write!(f, "report"),
        }
    }
}

// ============================================================================
// ITEM OUTCOME
// ============================================================================

/// Last stage an item reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStage {
    Pending,
    Transformed,
    Stored,
    Predicted,
    PredictionSkipped,
    PredictionFailed,
}

/// Result of processing one input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Position in the input batch
    pub index: usize,
    pub success: bool,
    pub stage: ItemStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<EntityKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ItemOutcome {
    pub fn pending(index: usize) -> Self {
        Self {
            index,
            success: false,
            stage: ItemStage::Pending,
            storage_key: None,
            prediction: None,
            error: None,
            error_kind: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.success = false;
        self.error_kind = Some(kind);
        self.error = Some(message.into());
    }
}

// ============================================================================
// BATCH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub predicted: usize,
    /// Percentage of successful items (0 for an empty batch)
    pub success_rate: f64,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[ItemOutcome]) -> Self {
        let total = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.success).count();
        let predicted = outcomes.iter().filter(|o| o.prediction.is_some()).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };

        Self {
            total,
            successful,
            failed: total - successful,
            predicted,
            success_rate,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} successful, {} failed, {} predicted ({:.1}%)",
            self.successful, self.total, self.failed, self.predicted, self.success_rate
        )
    }
}

/// Ordered per-item outcomes plus aggregate counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub outcomes: Vec<ItemOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(run_id: Uuid, outcomes: Vec<ItemOutcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self {
            run_id,
            outcomes,
            summary,
        }
    }
}
