//! Statistical Insight Discovery Engine
//!
//! Profiles a tabular dataset and discovers statistically meaningful
//! patterns for an analytics dashboard, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Column Classification**: numeric, categorical, temporal, boolean or text,
//!   from declared hints, storage types and sampled values
//! - **Basic Statistics**: correlations, distributions, quartile-range outliers,
//!   dominant categories, missing values, duplicates
//! - **Hypothesis Testing**: normality-gated choice between Welch's t, Mann-Whitney U,
//!   one-way ANOVA and Kruskal-Wallis, with effect sizes and confidence intervals
//! - **Anomaly Detection**: isolation forest, robust (MAD) z-score, standard z-score
//! - **Subspace Search (QUIS)**: segments where a weak global pattern becomes strong,
//!   category-specific deviations and temporal trends
//! - **Enhanced Analysis**: analytical questions (LLM or heuristic), Benjamini-Hochberg
//!   false-discovery-rate control and Simpson's paradox detection
//! - **Caching**: keyed results with a time-to-live and explicit invalidation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use insight_engine::{Dataset, InsightEngine, LogicalType};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("sales.csv".into()))?
//!     .finish()?;
//! let dataset = Dataset::new(df).declare("store_id", LogicalType::Categorical);
//!
//! let engine = InsightEngine::builder().build()?;
//! let result = engine.run_quis_analysis(&dataset, Some("sales.csv"));
//!
//! for insight in &result.deep_insights {
//!     println!("{:?} where {} (+{:.2})", insight.kind, insight.filter_label(), insight.improvement);
//! }
//! ```
//!
//! # Standalone Utilities
//!
//! ```rust,ignore
//! use insight_engine::{InsightEngine, compare_groups};
//!
//! let comparison = compare_groups(&[
//!     ("control".to_string(), control_values),
//!     ("treatment".to_string(), treatment_values),
//! ]);
//! if let Some(test) = comparison.test() {
//!     println!("{}: p = {:.4}", test.test_name, test.p_value);
//! }
//!
//! let anomalies = engine.detect_anomalies(&dataset, "revenue", "isolation_forest")?;
//! ```
//!
//! # Question Generators
//!
//! The enhanced analysis asks a [`ai::QuestionGenerator`] for analytical
//! questions. Without one (or when it fails) the deterministic
//! [`ai::HeuristicQuestionGenerator`] is used. With the `ai` feature the
//! [`ai::OpenRouterQuestionGenerator`] is available.

pub mod ai;
pub mod anomaly;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod profiler;
pub mod stats;
pub mod subspace;
pub mod testing;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use anomaly::{detect_anomalies, detect_anomalies_by_name};
pub use cache::ResultCache;
pub use config::{
    AnomalyConfig, AnomalyMethod, ConfigValidationError, InsightConfig, InsightConfigBuilder,
    SearchCaps,
};
pub use dataset::Dataset;
pub use engine::{InsightEngine, InsightEngineBuilder};
pub use error::{InsightError, Result as InsightResult, ResultExt};
pub use profiler::ColumnClassifier;
pub use stats::{BasicReport, BasicStatistics};
pub use subspace::{SearchOutcome, SubspaceSearch};
pub use testing::{HypothesisTester, compare_groups};
pub use types::{
    AnalyticalQuestion, AnomalyResult, ColumnProfile, ComparisonResult, CorrelationMethod,
    CorrelationResult, FilterCondition, Finding, HypothesisTestResult, InsightKind, LogicalType, QuestionAnswer,
    QuestionIntent, QuestionOutcome, QuisResult, QuisSummary, Significance, SimpsonParadox,
    SubspaceInsight,
};
