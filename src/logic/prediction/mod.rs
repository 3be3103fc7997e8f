//! Prediction Module
//!
//! ## Structure
//! - `types.rs` - PredictionResult, FeatureSchema
//! - `endpoint.rs` - ScoringEndpoint trait + HTTP implementation
//! - `publisher.rs` - Publisher trait + Pub/Sub implementation
//! - `client.rs` - PredictionClient tying the three together

pub mod types;
pub mod endpoint;
pub mod publisher;
pub mod client;

#[cfg(test)]
mod tests;

pub use client::PredictionClient;
pub use endpoint::HttpScoringEndpoint;
pub use publisher::PubSubPublisher;
pub use types::{FeatureSchema, PredictionResult};
