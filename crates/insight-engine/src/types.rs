use crate::config::AnomalyMethod;
use crate::error::InsightError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Column Profiles
// ============================================================================

/// Logical type of a column, as seen by the statistical checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Numeric,
    Categorical,
    Temporal,
    Boolean,
    Text,
}

impl LogicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Temporal => "temporal",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogicalType {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" | "float" | "integer" | "int" => Ok(Self::Numeric),
            "categorical" | "category" => Ok(Self::Categorical),
            "temporal" | "date" | "datetime" | "timestamp" => Ok(Self::Temporal),
            "boolean" | "bool" => Ok(Self::Boolean),
            "text" | "string" => Ok(Self::Text),
            other => Err(InsightError::InvalidConfig(format!(
                "unknown column type '{}'",
                other
            ))),
        }
    }
}

/// Profile of a single column, derived once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Storage type as reported by polars.
    pub dtype: String,
    pub logical_type: LogicalType,
    pub null_count: usize,
    pub unique_count: usize,
    /// Unique values divided by non-null values (0.0 for an all-null column).
    pub cardinality_ratio: f64,
    /// Whether the logical type came from a declared hint.
    pub declared: bool,
}

// ============================================================================
// Correlations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    Linear,
    /// Spearman rank correlation.
    Monotonic,
}

impl CorrelationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Monotonic => "monotonic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Strong,
    Moderate,
}

impl Strength {
    /// Label for an absolute correlation given the strong cut-off.
    pub fn classify(value: f64, strong_cutoff: f64) -> Self {
        if value.abs() >= strong_cutoff {
            Self::Strong
        } else {
            Self::Moderate
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub column_a: String,
    pub column_b: String,
    pub method: CorrelationMethod,
    /// Always within [-1, 1].
    pub value: f64,
    /// Number of complete pairs used.
    pub n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_p_value: Option<f64>,
    pub strength: Strength,
}

// ============================================================================
// Hypothesis Tests
// ============================================================================

/// The comparison test selected for a set of groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    WelchT,
    MannWhitneyU,
    OneWayAnova,
    KruskalWallis,
}

impl TestKind {
    /// Select the test for a group count and the outcome of the normality gate.
    pub fn select(group_count: usize, normal: bool) -> Self {
        match (group_count, normal) {
            (2, true) => Self::WelchT,
            (2, false) => Self::MannWhitneyU,
            (_, true) => Self::OneWayAnova,
            (_, false) => Self::KruskalWallis,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WelchT => "Welch's t-test",
            Self::MannWhitneyU => "Mann-Whitney U test",
            Self::OneWayAnova => "One-way ANOVA",
            Self::KruskalWallis => "Kruskal-Wallis H test",
        }
    }

    pub fn is_parametric(&self) -> bool {
        matches!(self, Self::WelchT | Self::OneWayAnova)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Confidence level, e.g. 0.95.
    pub level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisTestResult {
    pub test_name: String,
    pub test: TestKind,
    pub statistic: f64,
    pub p_value: f64,
    pub effect_size: f64,
    /// Name of the effect size measure (cohens_d, rank_biserial, eta_squared, epsilon_squared).
    pub effect_size_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,
    pub alpha: f64,
    /// Always equal to `p_value < alpha`.
    pub reject_null: bool,
}

/// Descriptive statistics of one group in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub name: String,
    pub n: usize,
    pub mean: f64,
    pub std: f64,
}

/// Outcome of the normality gate that selected the test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityCheck {
    /// Group the check ran on.
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    pub is_normal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupComparison {
    pub test: HypothesisTestResult,
    pub normality: NormalityCheck,
    pub groups: Vec<GroupStats>,
    /// Groups dropped for having too few observations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_groups: Vec<String>,
}

/// Result of `compare_groups`. Too few usable groups is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonResult {
    Tested(GroupComparison),
    InsufficientData { valid_groups: usize, reason: String },
}

impl ComparisonResult {
    /// The test result, if a test could be run.
    pub fn test(&self) -> Option<&HypothesisTestResult> {
        match self {
            Self::Tested(comparison) => Some(&comparison.test),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        self.test().map(|t| t.p_value)
    }
}

// ============================================================================
// Anomalies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub column: String,
    pub method: AnomalyMethod,
    /// Always equal to `outlier_indices.len()`.
    pub outlier_count: usize,
    /// Row indices into the original column (nulls keep their position).
    pub outlier_indices: Vec<usize>,
    /// Score above which a value was flagged.
    pub threshold: f64,
}

// ============================================================================
// Basic Findings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionShape {
    Normal,
    RightSkewed,
    LeftSkewed,
    HeavyTailed,
}

/// One dataset-wide finding from the basic statistics module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    StrongCorrelation(CorrelationResult),
    Outliers {
        column: String,
        q1: f64,
        q3: f64,
        lower_bound: f64,
        upper_bound: f64,
        outlier_count: usize,
        outlier_fraction: f64,
    },
    DominantCategory {
        column: String,
        value: String,
        count: usize,
        share: f64,
    },
    Distribution {
        column: String,
        n: usize,
        mean: f64,
        std: f64,
        skewness: f64,
        kurtosis: f64,
        shape: DistributionShape,
    },
    MissingValues {
        column: String,
        null_count: usize,
        null_percentage: f64,
    },
    DuplicateRows {
        count: usize,
        percentage: f64,
    },
    Anomalies(AnomalyResult),
}

impl Finding {
    /// Snake-case name of the finding kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StrongCorrelation(_) => "strong_correlation",
            Self::Outliers { .. } => "outliers",
            Self::DominantCategory { .. } => "dominant_category",
            Self::Distribution { .. } => "distribution",
            Self::MissingValues { .. } => "missing_values",
            Self::DuplicateRows { .. } => "duplicate_rows",
            Self::Anomalies(_) => "anomalies",
        }
    }

    /// Column the finding is about, if it concerns a single column.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Outliers { column, .. }
            | Self::DominantCategory { column, .. }
            | Self::Distribution { column, .. }
            | Self::MissingValues { column, .. } => Some(column),
            Self::Anomalies(result) => Some(&result.column),
            Self::StrongCorrelation(_) | Self::DuplicateRows { .. } => None,
        }
    }
}

// ============================================================================
// Subspace Insights
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    SubspaceCorrelation,
    TwoLevelSubspaceCorrelation,
    CategorySpecificPattern,
    TemporalSubspaceTrend,
}

/// Ordered so that `VeryHigh > High > Moderate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Moderate,
    High,
    VeryHigh,
}

/// One equality condition of a subspace filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub value: String,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

/// Statistics specific to each insight kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "statistic", rename_all = "snake_case")]
pub enum InsightDetail {
    Correlation {
        column_a: String,
        column_b: String,
        method: CorrelationMethod,
        base_value: f64,
        subspace_value: f64,
    },
    CategoryDeviation {
        category_column: String,
        numeric_column: String,
        subspace_mean: f64,
        global_mean: f64,
        global_std: f64,
        /// |subspace mean - global mean| in global standard deviations.
        deviation: f64,
    },
    TemporalTrend {
        temporal_column: String,
        numeric_column: String,
        /// Linear association between elapsed days and the value inside the subspace.
        subspace_trend: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        global_trend: Option<f64>,
        /// Least-squares slope in value units per day.
        slope_per_day: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubspaceInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// One or two conditions, in search order.
    pub filter: Vec<FilterCondition>,
    /// Always at least the configured minimum subspace size.
    pub subspace_size: usize,
    pub detail: InsightDetail,
    /// Subspace strength minus base strength.
    pub improvement: f64,
    pub significance: Significance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_p_value: Option<f64>,
}

impl SubspaceInsight {
    /// Human readable filter, e.g. `region = East AND tier = gold`.
    pub fn filter_label(&self) -> String {
        self.filter
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// A correlation whose sign reverses between the full dataset and a subspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpsonParadox {
    pub column_a: String,
    pub column_b: String,
    pub method: CorrelationMethod,
    pub global_value: f64,
    pub filter: Vec<FilterCondition>,
    pub subspace_value: f64,
    pub subspace_size: usize,
    pub significance: Significance,
}

// ============================================================================
// Analytical Questions
// ============================================================================

/// What an analytical question asks the engine to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum QuestionIntent {
    Correlation {
        column_a: String,
        column_b: String,
    },
    GroupComparison {
        group_column: String,
        value_column: String,
    },
    Trend {
        temporal_column: String,
        value_column: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticalQuestion {
    pub text: String,
    #[serde(flatten)]
    pub intent: QuestionIntent,
}

/// Evaluation of one analytical question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionOutcome {
    Correlation(CorrelationResult),
    GroupComparison(ComparisonResult),
    Trend {
        value: f64,
        n: usize,
        p_value: f64,
        slope_per_day: f64,
    },
    Unanswerable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: AnalyticalQuestion,
    pub outcome: QuestionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_p_value: Option<f64>,
    /// Source of the question (generator name or "heuristic").
    pub source: String,
}

// ============================================================================
// Aggregate Result
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignificanceCounts {
    pub moderate: usize,
    pub high: usize,
    pub very_high: usize,
}

impl SignificanceCounts {
    pub fn record(&mut self, significance: Significance) {
        match significance {
            Significance::Moderate => self.moderate += 1,
            Significance::High => self.high += 1,
            Significance::VeryHigh => self.very_high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.moderate + self.high + self.very_high
    }
}

/// Counts over one analysis run. Always present, all zero when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuisSummary {
    pub rows: usize,
    pub columns: usize,
    pub basic_insight_count: usize,
    pub deep_insight_count: usize,
    pub by_significance: SignificanceCounts,
    pub simpson_paradox_count: usize,
    pub questions_evaluated: usize,
    /// Number of p-values that entered the false-discovery-rate correction.
    pub hypotheses_tested: usize,
    /// Hypotheses still significant after the correction.
    pub significant_after_correction: usize,
    pub enhanced: bool,
}

/// Output of `run_quis_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuisResult {
    pub profiles: Vec<ColumnProfile>,
    pub basic_insights: Vec<Finding>,
    /// Correlations with exploratory <= |value| < strong, the subspace search input.
    pub exploratory_correlations: Vec<CorrelationResult>,
    /// Ranked subspace insights.
    pub deep_insights: Vec<SubspaceInsight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub question_answers: Vec<QuestionAnswer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub simpson_paradoxes: Vec<SimpsonParadox>,
    pub summary: QuisSummary,
    /// RFC 3339 timestamp of the computation.
    pub generated_at: String,
    pub duration_ms: u64,
}
