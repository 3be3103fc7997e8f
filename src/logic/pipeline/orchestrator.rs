//! Batch Orchestrator
//!
//! Runs transform -> store -> predict for each record in order. One bad
//! record never stops the batch; every record yields exactly one outcome.

use std::panic::{self, AssertUnwindSafe};

use uuid::Uuid;

use super::types::{BatchReport, ItemOutcome, ItemStage, SecondaryFailurePolicy};
use crate::constants::PROGRESS_LOG_INTERVAL;
use crate::logic::error::{ErrorKind, StorageError};
use crate::logic::journal::Journal;
use crate::logic::prediction::PredictionClient;
use crate::logic::record::{transform, RawRecord};
use crate::logic::storage::StorageWriter;

pub struct DataPipeline {
    writer: StorageWriter,
    predictor: Option<PredictionClient>,
    policy: SecondaryFailurePolicy,
    journal: Option<Journal>,
}

impl DataPipeline {
    pub fn new(writer: StorageWriter) -> Self {
        tracing::info!(
            backend = writer.backend(),
            collection = %writer.collection(),
            namespace = writer.namespace().unwrap_or("(default)"),
            "Initialized data pipeline"
        );

        Self {
            writer,
            predictor: None,
            policy: SecondaryFailurePolicy::default(),
            journal: None,
        }
    }

    pub fn with_predictor(mut self, predictor: PredictionClient) -> Self {
        tracing::info!(
            model = %predictor.model(),
            endpoint = %predictor.endpoint_url(),
            topic = predictor.topic().unwrap_or("(none)"),
            "Prediction enabled"
        );
        self.predictor = Some(predictor);
        self
    }

    pub fn with_policy(mut self, policy: SecondaryFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &StorageWriter {
        &self.writer
    }

    /// Process records in order, returning one outcome per record
    pub fn process_batch(&mut self, records: &[RawRecord]) -> BatchReport {
        let run_id = Uuid::new_v4();

        if records.is_empty() {
            tracing::warn!(%run_id, "Empty batch received");
            return BatchReport::new(run_id, Vec::new());
        }

        let total = records.len();
        tracing::info!(%run_id, batch_size = total, "Starting batch processing");

        let mut outcomes = Vec::with_capacity(total);
        for (index, raw) in records.iter().enumerate() {
            let mut outcome = ItemOutcome::pending(index);

            let run = panic::catch_unwind(AssertUnwindSafe(|| self.process_item(raw, &mut outcome)));
            if let Err(payload) = run {
                let message = panic_message(payload.as_ref());
                if outcome.storage_key.is_some() {
                    // Stored already: counts as a failed prediction, not a failed item
                    tracing::warn!(index, error = %message, "Prediction stage panicked (continuing)");
                    outcome.prediction = None;
                    outcome.stage = ItemStage::PredictionFailed;
                    outcome.warnings.push(format!("Prediction failed: unexpected error: {}", message));
                } else {
                    tracing::error!(index, error = %message, "Unexpected error processing item");
                    outcome.fail(ErrorKind::Unexpected, format!("Unexpected error: {}", message));
                }
            }

            if let Some(journal) = self.journal.as_mut() {
                if let Err(e) = journal.record(run_id, &outcome) {
                    tracing::warn!(index, error = %e, "Failed to journal outcome");
                }
            }

            outcomes.push(outcome);

            if (index + 1) % PROGRESS_LOG_INTERVAL == 0 || index + 1 == total {
                tracing::debug!(processed = index + 1, total, "Batch progress");
            }
        }

        let report = BatchReport::new(run_id, outcomes);
        let s = &report.summary;
        tracing::info!(
            %run_id,
            total = s.total,
            successful = s.successful,
            failed = s.failed,
            predicted = s.predicted,
            success_rate = %format!("{:.1}%", s.success_rate),
            "Batch processing complete"
        );

        report
    }

    fn process_item(&self, raw: &RawRecord, outcome: &mut ItemOutcome) {
        let index = outcome.index;

        let (storage_record, prediction_record) = match transform(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(index, error = %e, "Record validation failed");
                outcome.fail(ErrorKind::Validation, e.to_string());
                return;
            }
        };
        outcome.stage = ItemStage::Transformed;

        let key = match self.writer.write(&storage_record) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(index, error = %e, "Failed to store record");
                outcome.fail(ErrorKind::Storage, e.to_string());
                return;
            }
        };
        outcome.storage_key = Some(key.clone());
        outcome.stage = ItemStage::Stored;
        outcome.success = true;

        let Some(predictor) = &self.predictor else {
            outcome.stage = ItemStage::PredictionSkipped;
            return;
        };

        let scored = match predictor.predict(&prediction_record) {
            Ok(scored) => scored,
            Err(e) => {
                tracing::warn!(index, entity_key = %key, error = %e, "Prediction failed (continuing)");
                outcome.warnings.push(format!("Prediction failed: {}", e));
                outcome.stage = ItemStage::PredictionFailed;
                return;
            }
        };

        if let Some(e) = &scored.publish_error {
            self.secondary_failure(outcome, format!("Publish failed: {}", e));
        }

        match self.writer.attach_prediction(&key, &scored.result) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(index, entity_key = %key, "Entity not found for prediction update");
                self.secondary_failure(outcome, format!("Entity {} not found for prediction update", key));
            }
            Err(e) => {
                tracing::warn!(index, entity_key = %key, error = %e, "Failed to attach prediction");
                self.secondary_failure(outcome, format!("Failed to attach prediction to {}: {}", key, e));
            }
        }

        outcome.prediction = Some(scored.result);
        outcome.stage = ItemStage::Predicted;
    }

    fn secondary_failure(&self, outcome: &mut ItemOutcome, message: String) {
        match self.policy {
            SecondaryFailurePolicy::LogOnly => {
                tracing::debug!(index = outcome.index, warning = %message, "Secondary failure dropped");
            }
            SecondaryFailurePolicy::Report => outcome.warnings.push(message),
        }
    }

    /// Flush the journal and release the store
    pub fn close(mut self) -> Result<(), StorageError> {
        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = journal.flush() {
                tracing::warn!(error = %e, "Failed to flush journal");
            }
        }
        self.writer.close()?;
        tracing::info!("Data pipeline closed");
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
