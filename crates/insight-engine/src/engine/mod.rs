//! Insight ranker and aggregator.
//!
//! [`InsightEngine`] wires the column classifier, the basic statistics, the
//! subspace search and the optional enhanced layer together and owns the
//! result cache.

mod builder;
pub mod enhanced;
pub mod ranking;

pub use builder::{InsightEngine, InsightEngineBuilder};
pub use enhanced::{FdrSummary, apply_fdr_correction, evaluate_question};
pub use ranking::{count_by_significance, rank_insights};
