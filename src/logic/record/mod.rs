//! Record Module
//!
//! ## Structure
//! - `types.rs` - RawRecord, StorageRecord, PredictionRecord
//! - `transform.rs` - RawRecord -> (StorageRecord, PredictionRecord)

pub mod types;
pub mod transform;


pub use types::{PredictionRecord, RawRecord, StorageRecord};
pub use transform::transform;
