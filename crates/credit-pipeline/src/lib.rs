//! Scoring pipeline orchestration
//!
//! Ties ingestion, feature construction, the scoring engine and the store
//! into one serialized refresh cycle, and hosts the placeholder interval job.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{RefreshReport, ScoredIssuer, ScoringPipeline};
pub use scheduler::PlaceholderScheduler;
