//! Pipeline Module
//!
//! ## Structure
//! - `types.rs` - ItemOutcome, BatchReport, SecondaryFailurePolicy
//! - `orchestrator.rs` - DataPipeline (the per-item batch loop)
//!
//! ## Usage
//! ```ignore
//! let writer = StorageWriter::new(Box::new(store), "NetworkEvent", None);
//! let mut pipeline = DataPipeline::new(writer).with_predictor(client);
//! let report = pipeline.process_batch(&records);
//! pipeline.close()?;
//! ```

pub mod types;
pub mod orchestrator;


pub use orchestrator::DataPipeline;
pub use types::{ItemOutcome, SecondaryFailurePolicy};
