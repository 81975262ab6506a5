//! The insight engine and its builder.

use super::enhanced::{apply_fdr_correction, evaluate_question, outcome_p_value};
use super::ranking::{count_by_significance, rank_insights};
use crate::ai::{HeuristicQuestionGenerator, QuestionContext, QuestionGenerator};
use crate::anomaly::detect_anomalies_by_name;
use crate::cache::ResultCache;
use crate::config::{ConfigValidationError, InsightConfig};
use crate::dataset::Dataset;
use crate::error::{Result, ResultExt};
use crate::profiler::ColumnClassifier;
use crate::stats::basic::numeric_columns;
use crate::stats::{BasicReport, BasicStatistics};
use crate::subspace::SubspaceSearch;
use crate::testing::HypothesisTester;
use crate::types::{
    AnalyticalQuestion, AnomalyResult, ColumnProfile, ComparisonResult, CorrelationResult, Finding,
    QuestionAnswer, QuisResult, QuisSummary, SubspaceInsight,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Statistical insight discovery engine.
///
/// Use [`InsightEngine::builder()`] to create an engine with custom
/// configuration, an injected cache or a question generator.
///
/// # Example
///
/// ```rust,ignore
/// use insight_engine::{Dataset, InsightConfig, InsightEngine};
/// use polars::prelude::*;
///
/// let engine = InsightEngine::builder()
///     .config(InsightConfig::builder().max_depth(1).build()?)
///     .build()?;
///
/// let dataset = Dataset::new(df);
/// let result = engine.run_quis_analysis(&dataset, Some("sales-2024"));
/// println!("{} deep insights", result.summary.deep_insight_count);
///
/// // Second call within the TTL is served from the cache.
/// let again = engine.run_quis_analysis(&dataset, Some("sales-2024"));
/// assert!(std::sync::Arc::ptr_eq(&result, &again));
/// ```
pub struct InsightEngine {
    config: InsightConfig,
    cache: Arc<ResultCache>,
    question_generator: Option<Arc<dyn QuestionGenerator>>,
    computations: AtomicUsize,
}

// The engine is shared across request handlers and moved into worker threads.
static_assertions::assert_impl_all!(InsightEngine: Send, Sync);

impl Default for InsightEngine {
    fn default() -> Self {
        let config = InsightConfig::default();
        Self {
            cache: Arc::new(ResultCache::new(Duration::from_secs(config.cache_ttl_secs))),
            config,
            question_generator: None,
            computations: AtomicUsize::new(0),
        }
    }
}

impl InsightEngine {
    /// Create a new engine builder.
    pub fn builder() -> InsightEngineBuilder {
        InsightEngineBuilder::default()
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Number of full analyses actually computed (cache hits excluded).
    pub fn computation_count(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Drop the cached analysis for `cache_key`.
    pub fn invalidate(&self, cache_key: &str) -> bool {
        self.cache.invalidate(cache_key)
    }

    /// Profile every column of the dataset.
    pub fn profile(&self, dataset: &Dataset) -> Vec<ColumnProfile> {
        ColumnClassifier::from_config(&self.config).classify(dataset)
    }

    /// Dataset-wide findings only: correlations, outliers, distributions,
    /// dominant categories, anomalies, missing values and duplicates.
    pub fn run_all_statistical_checks(&self, dataset: &Dataset) -> Vec<Finding> {
        let profiles = self.profile(dataset);
        BasicStatistics::new(&self.config)
            .run(dataset, &profiles)
            .findings
    }

    /// Subspace insights only, ranked, searching filters up to `max_depth`
    /// conditions deep.
    pub fn find_deep_insights(&self, dataset: &Dataset, max_depth: usize) -> Vec<SubspaceInsight> {
        let profiles = self.profile(dataset);
        let basic = BasicStatistics::new(&self.config);
        let correlations = basic.correlations(&numeric_columns(dataset, &profiles));
        let candidates = basic.exploratory(&correlations);

        let mut insights = SubspaceSearch::new(&self.config)
            .with_max_depth(max_depth)
            .run(dataset, &profiles, &candidates)
            .insights;
        rank_insights(&mut insights);
        insights
    }

    /// Compare numeric values across groups with the configured significance level.
    pub fn compare_groups(&self, values_by_group: &[(String, Vec<f64>)]) -> ComparisonResult {
        HypothesisTester::new(self.config.alpha, self.config.min_group_size).compare(values_by_group)
    }

    /// Flag anomalous rows of one column.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown method name, a missing column or a
    /// column that cannot be read as numbers. Too few values is not an
    /// error and yields `Ok(None)`.
    pub fn detect_anomalies(
        &self,
        dataset: &Dataset,
        column: &str,
        method: &str,
    ) -> Result<Option<AnomalyResult>> {
        let values = dataset
            .numeric_values(column)
            .context(format!("Anomaly detection on '{}'", column))?;
        detect_anomalies_by_name(column, &values, method, &self.config.anomaly)
    }

    /// Full analysis: basic statistics, subspace search, ranking and, when
    /// enabled, the enhanced layer.
    ///
    /// With a `cache_key`, a result younger than the cache TTL is returned
    /// unchanged; otherwise the analysis is computed and stored under the
    /// key. Without a key nothing is cached.
    pub fn run_quis_analysis(&self, dataset: &Dataset, cache_key: Option<&str>) -> Arc<QuisResult> {
        if let Some(key) = cache_key
            && let Some(cached) = self.cache.get(key)
        {
            debug!(key, "Returning cached analysis");
            return cached;
        }

        let result = Arc::new(self.compute(dataset));
        if let Some(key) = cache_key {
            self.cache.insert(key, Arc::clone(&result));
        }
        result
    }

    fn compute(&self, dataset: &Dataset) -> QuisResult {
        self.computations.fetch_add(1, Ordering::Relaxed);
        let start_time = Instant::now();
        info!(
            rows = dataset.height(),
            columns = dataset.width(),
            "Starting insight analysis"
        );

        let profiles = self.profile(dataset);
        let BasicReport {
            mut findings,
            correlations,
            mut exploratory_correlations,
        } = BasicStatistics::new(&self.config).run(dataset, &profiles);
        info!(findings = findings.len(), "Basic statistics complete");

        let search = SubspaceSearch::new(&self.config).run(dataset, &profiles, &exploratory_correlations);
        let mut deep_insights = search.insights;
        info!(insights = deep_insights.len(), "Subspace search complete");

        let mut summary = QuisSummary {
            rows: dataset.height(),
            columns: dataset.width(),
            enhanced: self.config.enable_enhanced_analysis,
            ..QuisSummary::default()
        };

        let mut question_answers = Vec::new();
        let mut simpson_paradoxes = Vec::new();
        if self.config.enable_enhanced_analysis {
            question_answers = self.answer_questions(dataset, &profiles, &exploratory_correlations);
            let fdr = apply_fdr_correction(
                &correlations,
                &mut findings,
                &mut exploratory_correlations,
                &mut deep_insights,
                &mut question_answers,
                self.config.fdr_alpha,
            );
            summary.hypotheses_tested = fdr.hypotheses_tested;
            summary.significant_after_correction = fdr.significant_after_correction;
            summary.questions_evaluated = question_answers.len();

            simpson_paradoxes = search.reversals;
            for paradox in &simpson_paradoxes {
                warn!(
                    column_a = %paradox.column_a,
                    column_b = %paradox.column_b,
                    global = paradox.global_value,
                    subspace = paradox.subspace_value,
                    "Correlation reverses inside a subspace (Simpson's paradox)"
                );
            }
            summary.simpson_paradox_count = simpson_paradoxes.len();
        }

        rank_insights(&mut deep_insights);
        summary.basic_insight_count = findings.len();
        summary.deep_insight_count = deep_insights.len();
        summary.by_significance = count_by_significance(&deep_insights);

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            duration_ms,
            basic = summary.basic_insight_count,
            deep = summary.deep_insight_count,
            "Insight analysis complete"
        );

        QuisResult {
            profiles,
            basic_insights: findings,
            exploratory_correlations,
            deep_insights,
            question_answers,
            simpson_paradoxes,
            summary,
            generated_at: chrono::Utc::now().to_rfc3339(),
            duration_ms,
        }
    }

    fn answer_questions(
        &self,
        dataset: &Dataset,
        profiles: &[ColumnProfile],
        correlations: &[CorrelationResult],
    ) -> Vec<QuestionAnswer> {
        let context = QuestionContext::new(profiles, correlations, self.config.max_questions);
        let (questions, source) = self.generate_questions(&context);
        debug!(count = questions.len(), source = %source, "Evaluating analytical questions");

        questions
            .into_iter()
            .map(|question| {
                let outcome = evaluate_question(dataset, &question, &self.config);
                QuestionAnswer {
                    p_value: outcome_p_value(&outcome),
                    adjusted_p_value: None,
                    question,
                    outcome,
                    source: source.clone(),
                }
            })
            .collect()
    }

    /// Questions from the configured generator, falling back to the
    /// heuristic generator when it is absent, disabled, failing or empty.
    fn generate_questions(&self, context: &QuestionContext<'_>) -> (Vec<AnalyticalQuestion>, String) {
        if self.config.use_ai_questions
            && let Some(generator) = &self.question_generator
        {
            match generator.generate_questions(context) {
                Ok(questions) => {
                    let usable: Vec<AnalyticalQuestion> = questions
                        .into_iter()
                        .filter(|q| context.is_answerable(q))
                        .take(context.max_questions)
                        .collect();
                    if !usable.is_empty() {
                        return (usable, generator.name().to_string());
                    }
                    warn!(generator = generator.name(), "Generator returned no usable questions, using heuristics");
                }
                Err(e) => {
                    warn!(generator = generator.name(), error = %e, "Question generation failed, using heuristics");
                }
            }
        }

        let heuristic = HeuristicQuestionGenerator::new();
        let questions = heuristic.generate_questions(context).unwrap_or_default();
        (questions, heuristic.name().to_string())
    }
}

#[cfg(feature = "runtime")]
impl InsightEngine {
    /// Run [`run_quis_analysis`](Self::run_quis_analysis) on tokio's blocking
    /// pool so async callers never stall their executor.
    ///
    /// A panic inside the analysis is caught and reported as
    /// [`InsightError::Internal`](crate::error::InsightError::Internal).
    pub async fn run_quis_analysis_async(
        self: Arc<Self>,
        dataset: Dataset,
        cache_key: Option<String>,
    ) -> Result<Arc<QuisResult>> {
        use crate::error::InsightError;

        match tokio::task::spawn_blocking(move || {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                self.run_quis_analysis(&dataset, cache_key.as_deref())
            }))
        })
        .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_panic)) => Err(InsightError::Internal("Analysis task panicked".to_string())),
            Err(err) => Err(InsightError::Internal(format!("Analysis task failed: {err}"))),
        }
    }
}

/// Builder for [`InsightEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use insight_engine::{InsightEngine, ResultCache};
/// use insight_engine::ai::OpenRouterQuestionGenerator;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// // One cache shared by several engines
/// let cache = Arc::new(ResultCache::new(Duration::from_secs(600)));
///
/// let engine = InsightEngine::builder()
///     .cache(Arc::clone(&cache))
///     .question_generator(Arc::new(OpenRouterQuestionGenerator::from_env()?))
///     .build()?;
/// ```
#[derive(Default)]
pub struct InsightEngineBuilder {
    config: Option<InsightConfig>,
    cache: Option<Arc<ResultCache>>,
    question_generator: Option<Arc<dyn QuestionGenerator>>,
}

static_assertions::assert_impl_all!(InsightEngineBuilder: Send);

impl InsightEngineBuilder {
    pub fn config(mut self, config: InsightConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing cache instead of creating one from `cache_ttl_secs`.
    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the generator consulted by the enhanced analysis.
    ///
    /// If not provided, or `use_ai_questions` is false in the config,
    /// heuristic questions are used.
    pub fn question_generator(mut self, generator: Arc<dyn QuestionGenerator>) -> Self {
        self.question_generator = Some(generator);
        self
    }

    /// Build the engine.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<InsightEngine, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ResultCache::new(Duration::from_secs(config.cache_ttl_secs))));

        Ok(InsightEngine {
            config,
            cache,
            question_generator: self.question_generator,
            computations: AtomicUsize::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;
    use crate::types::{QuestionIntent, QuestionOutcome};
    use anyhow::anyhow;
    use polars::prelude::*;

    struct FailingGenerator;

    impl QuestionGenerator for FailingGenerator {
        fn generate_questions(&self, _context: &QuestionContext<'_>) -> anyhow::Result<Vec<AnalyticalQuestion>> {
            Err(anyhow!("service unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct FixedGenerator;

    impl QuestionGenerator for FixedGenerator {
        fn generate_questions(&self, _context: &QuestionContext<'_>) -> anyhow::Result<Vec<AnalyticalQuestion>> {
            Ok(vec![
                AnalyticalQuestion {
                    text: "Is price tied to quantity?".to_string(),
                    intent: QuestionIntent::Correlation {
                        column_a: "price".to_string(),
                        column_b: "quantity".to_string(),
                    },
                },
                AnalyticalQuestion {
                    text: "Is price tied to weather?".to_string(),
                    intent: QuestionIntent::Correlation {
                        column_a: "price".to_string(),
                        column_b: "weather".to_string(),
                    },
                },
            ])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn dataset() -> Dataset {
        let n = 60;
        let price: Vec<f64> = (0..n).map(|i| 10.0 + (i % 17) as f64).collect();
        let quantity: Vec<f64> = (0..n).map(|i| 100.0 - (i % 17) as f64 * 2.0 + (i % 5) as f64).collect();
        let region: Vec<&str> = (0..n).map(|i| ["North", "South", "West"][i % 3]).collect();
        Dataset::new(
            df![
                "price" => price,
                "quantity" => quantity,
                "region" => region,
            ]
            .unwrap(),
        )
    }

    #[test]
    fn test_builder_default() {
        let engine = InsightEngine::builder().build().unwrap();
        assert_eq!(engine.config().cache_ttl_secs, 300);
        assert_eq!(engine.cache().ttl(), Duration::from_secs(300));
        assert_eq!(engine.computation_count(), 0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = InsightConfig::default();
        config.alpha = 1.5;
        assert!(InsightEngine::builder().config(config).build().is_err());
    }

    #[test]
    fn test_builder_uses_injected_cache() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(10)));
        let engine = InsightEngine::builder().cache(Arc::clone(&cache)).build().unwrap();
        assert!(Arc::ptr_eq(engine.cache(), &cache));
    }

    #[test]
    fn test_cached_result_is_reused() {
        let engine = InsightEngine::default();
        let data = dataset();
        let first = engine.run_quis_analysis(&data, Some("k"));
        let second = engine.run_quis_analysis(&data, Some("k"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.computation_count(), 1);

        assert!(engine.invalidate("k"));
        engine.run_quis_analysis(&data, Some("k"));
        assert_eq!(engine.computation_count(), 2);
    }

    #[test]
    fn test_no_cache_key_always_computes() {
        let engine = InsightEngine::default();
        let data = dataset();
        engine.run_quis_analysis(&data, None);
        engine.run_quis_analysis(&data, None);
        assert_eq!(engine.computation_count(), 2);
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_failing_generator_falls_back_to_heuristics() {
        let engine = InsightEngine::builder()
            .question_generator(Arc::new(FailingGenerator))
            .build()
            .unwrap();
        let result = engine.run_quis_analysis(&dataset(), None);
        assert!(result.summary.enhanced);
        assert!(!result.question_answers.is_empty());
        assert!(result.question_answers.iter().all(|a| a.source == "heuristic"));
    }

    #[test]
    fn test_generator_questions_are_filtered() {
        let engine = InsightEngine::builder()
            .question_generator(Arc::new(FixedGenerator))
            .build()
            .unwrap();
        let result = engine.run_quis_analysis(&dataset(), None);
        assert_eq!(result.question_answers.len(), 1);
        assert_eq!(result.question_answers[0].source, "fixed");
        assert!(matches!(
            result.question_answers[0].outcome,
            QuestionOutcome::Correlation(_)
        ));
    }

    #[test]
    fn test_generator_ignored_when_ai_disabled() {
        let config = InsightConfig::builder().use_ai_questions(false).build().unwrap();
        let engine = InsightEngine::builder()
            .config(config)
            .question_generator(Arc::new(FixedGenerator))
            .build()
            .unwrap();
        let result = engine.run_quis_analysis(&dataset(), None);
        assert!(result.question_answers.iter().all(|a| a.source == "heuristic"));
    }

    #[test]
    fn test_deterministic_path_without_enhancement() {
        let config = InsightConfig::builder().enable_enhanced_analysis(false).build().unwrap();
        let engine = InsightEngine::builder().config(config).build().unwrap();
        let result = engine.run_quis_analysis(&dataset(), None);
        assert!(!result.summary.enhanced);
        assert!(result.question_answers.is_empty());
        assert!(result.simpson_paradoxes.is_empty());
        assert_eq!(result.summary.hypotheses_tested, 0);
        assert!(result.deep_insights.iter().all(|i| i.adjusted_p_value.is_none()));
    }

    #[test]
    fn test_detect_anomalies_errors() {
        let engine = InsightEngine::default();
        let data = dataset();
        assert!(matches!(
            engine.detect_anomalies(&data, "price", "lof"),
            Err(InsightError::UnknownAnomalyMethod(_))
        ));
        let err = engine.detect_anomalies(&data, "missing", "zscore").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(engine.detect_anomalies(&data, "price", "mad").unwrap().is_some());
    }

    #[test]
    fn test_compare_groups_uses_configured_alpha() {
        let config = InsightConfig::builder().alpha(0.01).build().unwrap();
        let engine = InsightEngine::builder().config(config).build().unwrap();
        let groups = vec![
            ("a".to_string(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b".to_string(), vec![2.0, 3.0, 4.0, 5.0, 6.0]),
        ];
        let result = engine.compare_groups(&groups);
        assert_eq!(result.test().unwrap().alpha, 0.01);
    }

    #[cfg(feature = "runtime")]
    #[tokio::test]
    async fn test_async_analysis_uses_shared_cache() {
        let engine = Arc::new(InsightEngine::default());
        let result = Arc::clone(&engine)
            .run_quis_analysis_async(dataset(), Some("async".to_string()))
            .await
            .unwrap();
        assert_eq!(result.summary.rows, 60);
        assert!(engine.cache().get("async").is_some());
        assert_eq!(engine.computation_count(), 1);
    }
}
