//! Configuration types for the insight engine.
//!
//! This module provides configuration options using the builder pattern.
//! Every threshold and every combinatorial cap used by the engine lives here,
//! so a reviewer can reason about worst-case latency before raising a cap.

use crate::error::InsightError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strategy for flagging anomalous observations in a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethod {
    /// Isolation forest with a fixed seed and an expected contamination rate.
    IsolationForest,
    /// Deviation from the median scaled by the median absolute deviation.
    #[default]
    RobustZScore,
    /// Classic (x - mean) / std score.
    ZScore,
}

impl AnomalyMethod {
    /// Stable name used in results and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsolationForest => "isolation_forest",
            Self::RobustZScore => "robust_z_score",
            Self::ZScore => "z_score",
        }
    }
}

impl FromStr for AnomalyMethod {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "isolation_forest" | "isolation" | "iforest" => Ok(Self::IsolationForest),
            "robust_z_score" | "robust_zscore" | "mad" => Ok(Self::RobustZScore),
            "z_score" | "zscore" => Ok(Self::ZScore),
            _ => Err(InsightError::UnknownAnomalyMethod(s.to_string())),
        }
    }
}

/// Settings for the anomaly detection module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Method used when the basic checks scan every numeric column.
    /// Default: RobustZScore
    pub method: AnomalyMethod,

    /// Expected share of anomalies for the isolation forest (0.0 - 0.5).
    /// Default: 0.05
    pub contamination: f64,

    /// Number of deviations beyond which a value is flagged by the z-score methods.
    /// Default: 3.0
    pub z_threshold: f64,

    /// Columns with fewer non-null values than this are skipped.
    /// Default: 10
    pub min_samples: usize,

    /// Number of isolation trees.
    /// Default: 100
    pub n_estimators: usize,

    /// Subsample size per isolation tree.
    /// Default: 256
    pub max_samples: usize,

    /// Seed for the isolation forest's random number generator.
    /// Default: 42
    pub seed: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            method: AnomalyMethod::default(),
            contamination: 0.05,
            z_threshold: 3.0,
            min_samples: 10,
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

/// Caps and thresholds for the subspace search.
///
/// Cost of each search step, with `C` candidate correlations, `K` categorical
/// columns, `V` values per column, `N` numeric columns, `T` temporal columns
/// and `n` rows:
///
/// - single-level correlations: `O(C * K * V * n)`
/// - two-level correlations: `O(C * K^2 * V^2 * n)`
/// - category deviations: `O(K * N * V * n)`
/// - temporal trends: `O(T * N * K * V * n)`
///
/// With the defaults and 100k rows every step stays within a few hundred
/// million elementary operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCaps {
    /// Categorical columns explored by the single-level and deviation searches.
    /// Default: 5
    pub max_categorical_columns: usize,

    /// Most frequent values tried per categorical column.
    /// Default: 5
    pub max_values_per_column: usize,

    /// Categorical columns combined pairwise in the two-level search.
    /// Default: 3
    pub two_level_columns: usize,

    /// Values per column in the two-level search.
    /// Default: 3
    pub two_level_values: usize,

    /// Numeric columns explored by the deviation and temporal searches.
    /// Default: 5
    pub max_numeric_columns: usize,

    /// Temporal columns explored by the temporal search.
    /// Default: 3
    pub max_temporal_columns: usize,

    /// Values per categorical column in the temporal search.
    /// Default: 3
    pub temporal_values: usize,

    /// Smallest subspace that may produce an insight.
    /// Default: 10
    pub min_subspace_size: usize,

    /// Smallest subspace for a temporal trend.
    /// Default: 20
    pub temporal_min_subspace_size: usize,

    /// Required |r| gain over the global value for a single-level subspace.
    /// Default: 0.2
    pub single_level_improvement: f64,

    /// Required |r| gain over the global value for a two-level subspace.
    /// Default: 0.3
    pub two_level_improvement: f64,

    /// Mean deviation (in global standard deviations) for a category pattern.
    /// Default: 1.5
    pub deviation_threshold: f64,

    /// Deviation above which a category pattern is rated high.
    /// Default: 2.0
    pub high_deviation_threshold: f64,

    /// |r| between elapsed time and the value for a temporal trend.
    /// Default: 0.6
    pub temporal_strength_threshold: f64,

    /// |r| above which a temporal trend is rated high.
    /// Default: 0.8
    pub temporal_high_threshold: f64,

    /// Deepest filter combination explored (1 = single conditions, 2 = pairs).
    /// Default: 2
    pub max_depth: usize,
}

impl Default for SearchCaps {
    fn default() -> Self {
        Self {
            max_categorical_columns: 5,
            max_values_per_column: 5,
            two_level_columns: 3,
            two_level_values: 3,
            max_numeric_columns: 5,
            max_temporal_columns: 3,
            temporal_values: 3,
            min_subspace_size: 10,
            temporal_min_subspace_size: 20,
            single_level_improvement: 0.2,
            two_level_improvement: 0.3,
            deviation_threshold: 1.5,
            high_deviation_threshold: 2.0,
            temporal_strength_threshold: 0.6,
            temporal_high_threshold: 0.8,
            max_depth: 2,
        }
    }
}

/// Configuration for the insight engine.
///
/// Use [`InsightConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use insight_engine::config::{InsightConfig, AnomalyMethod};
///
/// let config = InsightConfig::builder()
///     .correlation_threshold(0.75)
///     .anomaly_method(AnomalyMethod::IsolationForest)
///     .cache_ttl_secs(600)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    /// |r| at or above which a correlation is reported as a finding.
    /// Default: 0.7
    pub correlation_threshold: f64,

    /// Lower |r| bound of the exploratory stream fed to the subspace search.
    /// Default: 0.3
    pub exploratory_threshold: f64,

    /// |r| at or above which a correlation is labelled strong; correlations
    /// below it are the moderate candidates of the subspace search.
    /// Default: 0.8
    pub strong_correlation: f64,

    /// Minimum complete, paired observations for a correlation.
    /// Default: 5
    pub min_pair_observations: usize,

    /// Share of IQR outliers above which a column is reported.
    /// Default: 0.01
    pub outlier_fraction_threshold: f64,

    /// Share of the most frequent value above which a category is dominant.
    /// Default: 0.5
    pub dominant_category_threshold: f64,

    /// Unique/non-null ratio below which a string column is categorical.
    /// Default: 0.8
    pub categorical_ratio_threshold: f64,

    /// Share of sampled values that must parse as dates for a temporal column.
    /// Default: 0.7
    pub temporal_parse_ratio: f64,

    /// Number of non-null values sampled by the column classifier.
    /// Default: 100
    pub classifier_sample_size: usize,

    /// Significance level for hypothesis tests.
    /// Default: 0.05
    pub alpha: f64,

    /// Groups with fewer observations are excluded from comparisons.
    /// Default: 3
    pub min_group_size: usize,

    /// Anomaly detection settings.
    pub anomaly: AnomalyConfig,

    /// Subspace search caps and thresholds.
    pub search: SearchCaps,

    /// Seconds a cached analysis stays valid.
    /// Default: 300
    pub cache_ttl_secs: u64,

    /// Whether to run question evaluation, Benjamini-Hochberg correction and
    /// the Simpson's paradox check on top of the deterministic search.
    /// Default: true
    pub enable_enhanced_analysis: bool,

    /// Target false-discovery rate for the Benjamini-Hochberg procedure.
    /// Default: 0.05
    pub fdr_alpha: f64,

    /// Upper bound on analytical questions evaluated per run.
    /// Default: 10
    pub max_questions: usize,

    /// Whether to ask the configured question generator (LLM) at all.
    /// If false or no generator is attached, heuristic questions are used.
    /// Default: true
    pub use_ai_questions: bool,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: 0.7,
            exploratory_threshold: 0.3,
            strong_correlation: 0.8,
            min_pair_observations: 5,
            outlier_fraction_threshold: 0.01,
            dominant_category_threshold: 0.5,
            categorical_ratio_threshold: 0.8,
            temporal_parse_ratio: 0.7,
            classifier_sample_size: 100,
            alpha: 0.05,
            min_group_size: 3,
            anomaly: AnomalyConfig::default(),
            search: SearchCaps::default(),
            cache_ttl_secs: 300,
            enable_enhanced_analysis: true,
            fdr_alpha: 0.05,
            max_questions: 10,
            use_ai_questions: true,
        }
    }
}

impl InsightConfig {
    /// Create a new configuration builder.
    pub fn builder() -> InsightConfigBuilder {
        InsightConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let unit_fields = [
            ("correlation_threshold", self.correlation_threshold),
            ("exploratory_threshold", self.exploratory_threshold),
            ("strong_correlation", self.strong_correlation),
            ("outlier_fraction_threshold", self.outlier_fraction_threshold),
            ("dominant_category_threshold", self.dominant_category_threshold),
            ("categorical_ratio_threshold", self.categorical_ratio_threshold),
            ("temporal_parse_ratio", self.temporal_parse_ratio),
            ("temporal_strength_threshold", self.search.temporal_strength_threshold),
            ("temporal_high_threshold", self.search.temporal_high_threshold),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [("alpha", self.alpha), ("fdr_alpha", self.fdr_alpha)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigValidationError::InvalidSignificance {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.exploratory_threshold > self.strong_correlation {
            return Err(ConfigValidationError::InconsistentThresholds {
                lower: "exploratory_threshold".to_string(),
                upper: "strong_correlation".to_string(),
            });
        }

        let counts = [
            ("min_pair_observations", self.min_pair_observations),
            ("classifier_sample_size", self.classifier_sample_size),
            ("min_group_size", self.min_group_size),
            ("anomaly.min_samples", self.anomaly.min_samples),
            ("anomaly.n_estimators", self.anomaly.n_estimators),
            ("anomaly.max_samples", self.anomaly.max_samples),
            ("search.min_subspace_size", self.search.min_subspace_size),
            ("search.temporal_min_subspace_size", self.search.temporal_min_subspace_size),
            ("search.max_categorical_columns", self.search.max_categorical_columns),
            ("search.max_values_per_column", self.search.max_values_per_column),
            ("search.two_level_columns", self.search.two_level_columns),
            ("search.two_level_values", self.search.two_level_values),
            ("search.max_numeric_columns", self.search.max_numeric_columns),
            ("search.max_temporal_columns", self.search.max_temporal_columns),
            ("search.temporal_values", self.search.temporal_values),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        let margins = [
            ("search.single_level_improvement", self.search.single_level_improvement),
            ("search.two_level_improvement", self.search.two_level_improvement),
            ("search.deviation_threshold", self.search.deviation_threshold),
            ("search.high_deviation_threshold", self.search.high_deviation_threshold),
        ];
        for (field, value) in margins {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigValidationError::InvalidMargin {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.search.deviation_threshold > self.search.high_deviation_threshold {
            return Err(ConfigValidationError::InconsistentThresholds {
                lower: "search.deviation_threshold".to_string(),
                upper: "search.high_deviation_threshold".to_string(),
            });
        }

        if self.min_pair_observations < 3 {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "min_pair_observations".to_string(),
                value: self.min_pair_observations as f64,
            });
        }

        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination <= 0.5) {
            return Err(ConfigValidationError::InvalidContamination(
                self.anomaly.contamination,
            ));
        }

        if self.anomaly.z_threshold <= 0.0 || !self.anomaly.z_threshold.is_finite() {
            return Err(ConfigValidationError::InvalidZThreshold(
                self.anomaly.z_threshold,
            ));
        }

        if self.search.max_depth > 2 {
            return Err(ConfigValidationError::InvalidDepth(self.search.max_depth));
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigValidationError::ZeroCount("cache_ttl_secs".to_string()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid significance level for '{field}': {value} (must be strictly between 0 and 1)")]
    InvalidSignificance { field: String, value: f64 },

    #[error("'{lower}' must not exceed '{upper}'")]
    InconsistentThresholds { lower: String, upper: String },

    #[error("'{0}' must be at least 1")]
    ZeroCount(String),

    #[error("Invalid value for '{field}': {value} (must be positive and finite)")]
    InvalidMargin { field: String, value: f64 },

    #[error("Invalid contamination: {0} (must be in (0.0, 0.5])")]
    InvalidContamination(f64),

    #[error("Invalid z-score threshold: {0} (must be positive)")]
    InvalidZThreshold(f64),

    #[error("Invalid search depth: {0} (supported depths are 0, 1 and 2)")]
    InvalidDepth(usize),
}

/// Builder for [`InsightConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct InsightConfigBuilder {
    correlation_threshold: Option<f64>,
    exploratory_threshold: Option<f64>,
    strong_correlation: Option<f64>,
    min_pair_observations: Option<usize>,
    outlier_fraction_threshold: Option<f64>,
    dominant_category_threshold: Option<f64>,
    categorical_ratio_threshold: Option<f64>,
    temporal_parse_ratio: Option<f64>,
    classifier_sample_size: Option<usize>,
    alpha: Option<f64>,
    min_group_size: Option<usize>,
    anomaly: Option<AnomalyConfig>,
    anomaly_method: Option<AnomalyMethod>,
    search: Option<SearchCaps>,
    max_depth: Option<usize>,
    cache_ttl_secs: Option<u64>,
    enable_enhanced_analysis: Option<bool>,
    fdr_alpha: Option<f64>,
    max_questions: Option<usize>,
    use_ai_questions: Option<bool>,
}

impl InsightConfigBuilder {
    /// Set the |r| at or above which correlations are reported.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.7)
    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = Some(threshold);
        self
    }

    /// Set the lower bound of the exploratory correlation stream.
    pub fn exploratory_threshold(mut self, threshold: f64) -> Self {
        self.exploratory_threshold = Some(threshold);
        self
    }

    /// Set the |r| from which a correlation is labelled strong.
    pub fn strong_correlation(mut self, threshold: f64) -> Self {
        self.strong_correlation = Some(threshold);
        self
    }

    /// Set the minimum number of paired observations for a correlation.
    pub fn min_pair_observations(mut self, n: usize) -> Self {
        self.min_pair_observations = Some(n);
        self
    }

    /// Set the outlier share above which IQR outliers are reported.
    pub fn outlier_fraction_threshold(mut self, fraction: f64) -> Self {
        self.outlier_fraction_threshold = Some(fraction);
        self
    }

    /// Set the share above which the most frequent category is dominant.
    pub fn dominant_category_threshold(mut self, share: f64) -> Self {
        self.dominant_category_threshold = Some(share);
        self
    }

    /// Set the cardinality ratio separating categorical from text columns.
    pub fn categorical_ratio_threshold(mut self, ratio: f64) -> Self {
        self.categorical_ratio_threshold = Some(ratio);
        self
    }

    /// Set the share of parseable samples needed for a temporal column.
    pub fn temporal_parse_ratio(mut self, ratio: f64) -> Self {
        self.temporal_parse_ratio = Some(ratio);
        self
    }

    /// Set how many non-null values the classifier samples per column.
    pub fn classifier_sample_size(mut self, n: usize) -> Self {
        self.classifier_sample_size = Some(n);
        self
    }

    /// Set the significance level for hypothesis tests.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Set the minimum group size for comparisons.
    pub fn min_group_size(mut self, n: usize) -> Self {
        self.min_group_size = Some(n);
        self
    }

    /// Replace the whole anomaly detection configuration.
    pub fn anomaly(mut self, anomaly: AnomalyConfig) -> Self {
        self.anomaly = Some(anomaly);
        self
    }

    /// Set only the anomaly detection method.
    pub fn anomaly_method(mut self, method: AnomalyMethod) -> Self {
        self.anomaly_method = Some(method);
        self
    }

    /// Replace the whole set of subspace search caps.
    pub fn search(mut self, search: SearchCaps) -> Self {
        self.search = Some(search);
        self
    }

    /// Set only the maximum filter depth of the subspace search.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the cache time-to-live in seconds.
    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = Some(secs);
        self
    }

    /// Enable or disable the enhanced (questions + FDR + Simpson) path.
    pub fn enable_enhanced_analysis(mut self, enable: bool) -> Self {
        self.enable_enhanced_analysis = Some(enable);
        self
    }

    /// Set the target false-discovery rate.
    pub fn fdr_alpha(mut self, alpha: f64) -> Self {
        self.fdr_alpha = Some(alpha);
        self
    }

    /// Set the maximum number of analytical questions per run.
    pub fn max_questions(mut self, n: usize) -> Self {
        self.max_questions = Some(n);
        self
    }

    /// Enable or disable asking the attached question generator.
    pub fn use_ai_questions(mut self, use_ai: bool) -> Self {
        self.use_ai_questions = Some(use_ai);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `InsightConfig` or an error if validation fails.
    pub fn build(self) -> Result<InsightConfig, ConfigValidationError> {
        let defaults = InsightConfig::default();

        let mut anomaly = self.anomaly.unwrap_or(defaults.anomaly);
        if let Some(method) = self.anomaly_method {
            anomaly.method = method;
        }
        let mut search = self.search.unwrap_or(defaults.search);
        if let Some(depth) = self.max_depth {
            search.max_depth = depth;
        }

        let config = InsightConfig {
            correlation_threshold: self
                .correlation_threshold
                .unwrap_or(defaults.correlation_threshold),
            exploratory_threshold: self
                .exploratory_threshold
                .unwrap_or(defaults.exploratory_threshold),
            strong_correlation: self.strong_correlation.unwrap_or(defaults.strong_correlation),
            min_pair_observations: self
                .min_pair_observations
                .unwrap_or(defaults.min_pair_observations),
            outlier_fraction_threshold: self
                .outlier_fraction_threshold
                .unwrap_or(defaults.outlier_fraction_threshold),
            dominant_category_threshold: self
                .dominant_category_threshold
                .unwrap_or(defaults.dominant_category_threshold),
            categorical_ratio_threshold: self
                .categorical_ratio_threshold
                .unwrap_or(defaults.categorical_ratio_threshold),
            temporal_parse_ratio: self
                .temporal_parse_ratio
                .unwrap_or(defaults.temporal_parse_ratio),
            classifier_sample_size: self
                .classifier_sample_size
                .unwrap_or(defaults.classifier_sample_size),
            alpha: self.alpha.unwrap_or(defaults.alpha),
            min_group_size: self.min_group_size.unwrap_or(defaults.min_group_size),
            anomaly,
            search,
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or(defaults.cache_ttl_secs),
            enable_enhanced_analysis: self
                .enable_enhanced_analysis
                .unwrap_or(defaults.enable_enhanced_analysis),
            fdr_alpha: self.fdr_alpha.unwrap_or(defaults.fdr_alpha),
            max_questions: self.max_questions.unwrap_or(defaults.max_questions),
            use_ai_questions: self.use_ai_questions.unwrap_or(defaults.use_ai_questions),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InsightConfig::default();
        assert_eq!(config.correlation_threshold, 0.7);
        assert_eq!(config.exploratory_threshold, 0.3);
        assert_eq!(config.search.min_subspace_size, 10);
        assert_eq!(config.search.max_categorical_columns, 5);
        assert_eq!(config.search.two_level_columns, 3);
        assert_eq!(config.anomaly.contamination, 0.05);
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_defaults() {
        let config = InsightConfig::builder().build().unwrap();
        assert_eq!(config.correlation_threshold, 0.7);
        assert_eq!(config.anomaly.method, AnomalyMethod::RobustZScore);
        assert_eq!(config.search.max_depth, 2);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = InsightConfig::builder()
            .correlation_threshold(0.6)
            .anomaly_method(AnomalyMethod::IsolationForest)
            .max_depth(1)
            .cache_ttl_secs(60)
            .enable_enhanced_analysis(false)
            .build()
            .unwrap();

        assert_eq!(config.correlation_threshold, 0.6);
        assert_eq!(config.anomaly.method, AnomalyMethod::IsolationForest);
        assert_eq!(config.search.max_depth, 1);
        assert_eq!(config.cache_ttl_secs, 60);
        assert!(!config.enable_enhanced_analysis);
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = InsightConfig::builder().correlation_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_inconsistent_thresholds() {
        let result = InsightConfig::builder()
            .exploratory_threshold(0.9)
            .strong_correlation(0.8)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InconsistentThresholds { .. }
        ));
    }

    #[test]
    fn test_validation_invalid_depth() {
        let result = InsightConfig::builder().max_depth(3).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDepth(3)
        ));
    }

    #[test]
    fn test_validation_zero_search_caps() {
        let zeroed: [fn(&mut SearchCaps); 7] = [
            |s| s.max_categorical_columns = 0,
            |s| s.max_values_per_column = 0,
            |s| s.two_level_columns = 0,
            |s| s.two_level_values = 0,
            |s| s.max_numeric_columns = 0,
            |s| s.max_temporal_columns = 0,
            |s| s.temporal_values = 0,
        ];
        for zero in zeroed {
            let mut search = SearchCaps::default();
            zero(&mut search);
            let result = InsightConfig::builder().search(search).build();
            assert!(matches!(
                result.unwrap_err(),
                ConfigValidationError::ZeroCount(field) if field.starts_with("search.")
            ));
        }
    }

    #[test]
    fn test_validation_invalid_margins() {
        for value in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let search = SearchCaps {
                single_level_improvement: value,
                ..SearchCaps::default()
            };
            let result = InsightConfig::builder().search(search).build();
            assert!(matches!(
                result.unwrap_err(),
                ConfigValidationError::InvalidMargin { .. }
            ));
        }

        let search = SearchCaps {
            deviation_threshold: f64::NAN,
            ..SearchCaps::default()
        };
        assert!(InsightConfig::builder().search(search).build().is_err());
    }

    #[test]
    fn test_validation_deviation_ordering() {
        let search = SearchCaps {
            deviation_threshold: 2.5,
            high_deviation_threshold: 2.0,
            ..SearchCaps::default()
        };
        let result = InsightConfig::builder().search(search).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InconsistentThresholds { .. }
        ));
    }

    #[test]
    fn test_validation_invalid_contamination() {
        let anomaly = AnomalyConfig {
            contamination: 0.9,
            ..AnomalyConfig::default()
        };
        let result = InsightConfig::builder().anomaly(anomaly).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidContamination(_)
        ));
    }

    #[test]
    fn test_anomaly_method_from_str() {
        assert_eq!(
            "isolation_forest".parse::<AnomalyMethod>().unwrap(),
            AnomalyMethod::IsolationForest
        );
        assert_eq!(
            "Robust-Z-Score".parse::<AnomalyMethod>().unwrap(),
            AnomalyMethod::RobustZScore
        );
        let err = "lof".parse::<AnomalyMethod>().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "correlation_threshold": 0.65,
            "exploratory_threshold": 0.25,
            "strong_correlation": 0.85,
            "min_pair_observations": 8,
            "outlier_fraction_threshold": 0.02,
            "dominant_category_threshold": 0.6,
            "categorical_ratio_threshold": 0.5,
            "temporal_parse_ratio": 0.7,
            "classifier_sample_size": 50,
            "alpha": 0.01,
            "min_group_size": 5,
            "anomaly": {
                "method": "isolation_forest",
                "contamination": 0.1,
                "z_threshold": 3.5,
                "min_samples": 20,
                "n_estimators": 50,
                "max_samples": 128,
                "seed": 7
            },
            "search": {
                "max_categorical_columns": 4,
                "max_values_per_column": 4,
                "two_level_columns": 2,
                "two_level_values": 2,
                "max_numeric_columns": 3,
                "max_temporal_columns": 1,
                "temporal_values": 2,
                "min_subspace_size": 15,
                "temporal_min_subspace_size": 30,
                "single_level_improvement": 0.25,
                "two_level_improvement": 0.35,
                "deviation_threshold": 1.5,
                "high_deviation_threshold": 2.5,
                "temporal_strength_threshold": 0.6,
                "temporal_high_threshold": 0.85,
                "max_depth": 1
            },
            "cache_ttl_secs": 120,
            "enable_enhanced_analysis": false,
            "fdr_alpha": 0.1,
            "max_questions": 4,
            "use_ai_questions": false
        }"#;

        let config: InsightConfig =
            serde_json::from_str(json).expect("Should deserialize from API JSON");

        assert_eq!(config.correlation_threshold, 0.65);
        assert_eq!(config.anomaly.method, AnomalyMethod::IsolationForest);
        assert_eq!(config.anomaly.seed, 7);
        assert_eq!(config.search.min_subspace_size, 15);
        assert_eq!(config.search.max_depth, 1);
        assert!(!config.enable_enhanced_analysis);
        assert!(config.validate().is_ok());
    }
}
