//! Integration tests for the insight discovery engine.
//!
//! These tests verify end-to-end behavior of the engine on small synthetic
//! datasets whose statistics are known in advance.

use insight_engine::ai::{QuestionContext, QuestionGenerator};
use insight_engine::types::Strength;
use insight_engine::{
    AnalyticalQuestion, ComparisonResult, CorrelationMethod, Dataset, FilterCondition, Finding,
    InsightConfig, InsightEngine, InsightKind, LogicalType, QuisResult, Significance,
    compare_groups,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ============================================================================
// Helper Functions
// ============================================================================

/// Scenario A: y = 2x, no noise, 100 rows.
fn perfectly_correlated() -> Dataset {
    let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
    Dataset::new(df!["x" => x, "y" => y].unwrap())
}

/// Scenario B: inside "East" y follows x closely; elsewhere y is mostly noise.
/// Globally the best coefficient is monotonic, about 0.40; inside East 0.96.
fn regional() -> DataFrame {
    let noise = [5.0, -3.0, 8.0, -7.0, 2.0, -9.0, 6.0, -1.0, 4.0, -5.0];
    let small = [0.8, -0.5, 1.2, -1.0, 0.3, -1.4, 0.9, -0.2, 0.6, -0.7];
    let mut region = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for (r, name) in ["East", "West", "North"].iter().enumerate() {
        for i in 0..40 {
            let xi = i as f64;
            region.push(*name);
            x.push(xi);
            y.push(if r == 0 {
                0.5 * xi + small[(i * 3) % 10] * 2.0
            } else {
                20.0 + noise[(i * 7 + r) % 10] * 2.0 + 0.45 * xi
            });
        }
    }
    df!["region" => region, "x" => x, "y" => y].unwrap()
}

/// Scenario C: 95 ordinary values and 5 at roughly ten times the mean.
fn with_extreme_values() -> Dataset {
    let mut amount: Vec<f64> = (0..95).map(|i| 10.0 + (i % 7) as f64).collect();
    amount.extend([130.0, 135.0, 140.0, 128.0, 132.0]);
    Dataset::new(df!["amount" => amount].unwrap())
}

/// Positive association overall, negative inside every group.
fn simpson() -> Dataset {
    let noise = [0.3, -0.2, 0.1, -0.4, 0.25, -0.1, 0.35, -0.3, 0.05, -0.15];
    let mut group = Vec::new();
    let mut dose = Vec::new();
    let mut response = Vec::new();
    for (g, name) in ["A", "B", "C"].iter().enumerate() {
        for i in 0..20 {
            group.push(*name);
            dose.push(10.0 * g as f64 + i as f64 * 0.5);
            response.push(5.0 * g as f64 - 0.3 * i as f64 + noise[(i * 3 + g) % 10]);
        }
    }
    Dataset::new(df!["group" => group, "dose" => dose, "response" => response].unwrap())
}

/// Generator standing in for an unreachable remote service.
struct UnavailableGenerator;

impl QuestionGenerator for UnavailableGenerator {
    fn generate_questions(
        &self,
        _context: &QuestionContext<'_>,
    ) -> anyhow::Result<Vec<AnalyticalQuestion>> {
        Err(anyhow::anyhow!("connection refused"))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

fn deterministic_engine() -> InsightEngine {
    InsightEngine::builder()
        .config(InsightConfig::builder().use_ai_questions(false).build().unwrap())
        .build()
        .unwrap()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_scenario_a_perfect_correlation() {
    let engine = deterministic_engine();
    let findings = engine.run_all_statistical_checks(&perfectly_correlated());

    let correlation = findings
        .iter()
        .find_map(|f| match f {
            Finding::StrongCorrelation(c) => Some(c),
            _ => None,
        })
        .expect("strong correlation expected");
    assert!((correlation.value - 1.0).abs() < 1e-9);
    assert_eq!(correlation.strength, Strength::Strong);
    assert_eq!(correlation.method, CorrelationMethod::Linear);
    assert_eq!(correlation.n, 100);
}

#[test]
fn test_scenario_b_regional_subspace() {
    let engine = deterministic_engine();
    let insights = engine.find_deep_insights(&Dataset::new(regional()), 2);

    let east = insights
        .iter()
        .find(|i| {
            i.kind == InsightKind::SubspaceCorrelation
                && i.filter == vec![FilterCondition::new("region", "East")]
        })
        .expect("East subspace expected");
    assert!(east.improvement >= 0.2);
    assert_eq!(east.subspace_size, 40);
    assert_eq!(east.significance, Significance::High);
}

#[test]
fn test_scenario_b_with_declared_integer_codes() {
    let mut frame = regional();
    let codes: Vec<i64> = (0..120).map(|i| (i / 40) as i64 + 1).collect();
    frame.replace("region", Series::new("region".into(), codes)).unwrap();
    let dataset = Dataset::new(frame).declare("region", LogicalType::Categorical);

    let insights = deterministic_engine().find_deep_insights(&dataset, 1);
    assert!(insights.iter().any(|i| {
        i.kind == InsightKind::SubspaceCorrelation
            && i.filter == vec![FilterCondition::new("region", "1")]
    }));
}

#[test]
fn test_scenario_c_quartile_outliers() {
    let findings = deterministic_engine().run_all_statistical_checks(&with_extreme_values());

    let (count, fraction) = findings
        .iter()
        .find_map(|f| match f {
            Finding::Outliers {
                outlier_count,
                outlier_fraction,
                ..
            } => Some((*outlier_count, *outlier_fraction)),
            _ => None,
        })
        .expect("outlier finding expected");
    assert_eq!(count, 5);
    assert!(fraction > 0.01);
}

#[test]
fn test_simpson_paradox_detected() {
    let result = deterministic_engine().run_quis_analysis(&simpson(), None);

    assert!(result.summary.simpson_paradox_count >= 3);
    let groups: Vec<&str> = result
        .simpson_paradoxes
        .iter()
        .map(|p| p.filter[0].value.as_str())
        .collect();
    assert_eq!(groups, vec!["A", "B", "C"]);
    for paradox in &result.simpson_paradoxes {
        assert!(paradox.global_value > 0.0);
        assert!(paradox.subspace_value < 0.0);
        assert_eq!(paradox.significance, Significance::VeryHigh);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[test]
fn test_deep_insights_are_deterministic() {
    let dataset = Dataset::new(regional());
    let engine = deterministic_engine();

    let first = engine.run_quis_analysis(&dataset, Some("regional"));
    engine.cache().clear();
    let second = engine.run_quis_analysis(&dataset, Some("regional"));

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.deep_insights, second.deep_insights);
    assert_eq!(engine.computation_count(), 2);
}

#[test]
fn test_cached_analysis_is_byte_identical() {
    let dataset = Dataset::new(regional());
    let engine = deterministic_engine();

    let first = engine.run_quis_analysis(&dataset, Some("regional"));
    let second = engine.run_quis_analysis(&dataset, Some("regional"));

    assert_eq!(
        serde_json::to_string(first.as_ref()).unwrap(),
        serde_json::to_string(second.as_ref()).unwrap()
    );
    assert_eq!(engine.computation_count(), 1);
}

#[test]
fn test_correlations_within_bounds() {
    let result = deterministic_engine().run_quis_analysis(&Dataset::new(regional()), None);

    for c in &result.exploratory_correlations {
        assert!((-1.0..=1.0).contains(&c.value));
    }
    for finding in &result.basic_insights {
        if let Finding::StrongCorrelation(c) = finding {
            assert!((-1.0..=1.0).contains(&c.value));
        }
    }
}

#[test]
fn test_subspace_size_and_improvement_bounds() {
    let engine = deterministic_engine();
    for dataset in [Dataset::new(regional()), simpson()] {
        let result = engine.run_quis_analysis(&dataset, None);
        for insight in &result.deep_insights {
            match insight.kind {
                InsightKind::TemporalSubspaceTrend => assert!(insight.subspace_size >= 20),
                _ => assert!(insight.subspace_size >= 10),
            }
            match insight.kind {
                InsightKind::SubspaceCorrelation => assert!(insight.improvement > 0.2),
                InsightKind::TwoLevelSubspaceCorrelation => assert!(insight.improvement > 0.3),
                _ => {}
            }
        }
    }
}

#[test]
fn test_deep_insights_ranked_by_tier() {
    let result = deterministic_engine().run_quis_analysis(&Dataset::new(regional()), None);
    let tiers: Vec<Significance> = result.deep_insights.iter().map(|i| i.significance).collect();
    let mut sorted = tiers.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(tiers, sorted);
    assert_eq!(result.summary.by_significance.total(), result.deep_insights.len());
}

#[test]
fn test_reject_null_matches_p_value() {
    let cases = vec![
        vec![
            ("a".to_string(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]),
            ("b".to_string(), vec![11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0, 19.0, 20.0]),
        ],
        vec![
            ("a".to_string(), vec![1.0, 5.0, 3.0, 4.0, 2.0]),
            ("b".to_string(), vec![2.0, 4.0, 3.0, 5.0, 1.0]),
            ("c".to_string(), vec![3.0, 1.0, 5.0, 2.0, 4.0]),
        ],
    ];
    for groups in cases {
        let ComparisonResult::Tested(comparison) = compare_groups(&groups) else {
            panic!("comparison should run");
        };
        let test = comparison.test;
        assert_eq!(test.reject_null, test.p_value < test.alpha);
    }
}

#[test]
fn test_fdr_adjustment_fills_adjusted_p_values() {
    let result = deterministic_engine().run_quis_analysis(&Dataset::new(regional()), None);

    assert!(result.summary.enhanced);
    assert!(result.summary.hypotheses_tested > 0);
    assert!(result.summary.significant_after_correction <= result.summary.hypotheses_tested);
    for insight in result.deep_insights.iter().filter(|i| i.p_value.is_some()) {
        let (raw, adjusted) = (insight.p_value.unwrap(), insight.adjusted_p_value.unwrap());
        assert!(adjusted >= raw);
        assert!(adjusted <= 1.0);
    }
    assert!(!result.question_answers.is_empty());
}

// ============================================================================
// Graceful Degradation Tests
// ============================================================================

#[test]
fn test_degenerate_columns_do_not_abort() {
    let frame = df![
        "empty" => [None::<f64>, None, None, None, None, None],
        "constant" => [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        "notes" => ["a b", "c d", "e f", "g h", "i j", "k l"],
    ]
    .unwrap();
    let result = deterministic_engine().run_quis_analysis(&Dataset::new(frame), None);

    assert_eq!(result.summary.rows, 6);
    assert_eq!(result.summary.columns, 3);
    assert!(result.deep_insights.is_empty());
    assert!(result.basic_insights.iter().any(|f| matches!(
        f,
        Finding::MissingValues { column, .. } if column == "empty"
    )));
}

#[test]
fn test_single_numeric_column_has_no_deep_insights() {
    let amount: Vec<f64> = (0..500).map(|i| 100.0 + ((i * 37) % 101) as f64).collect();
    let dataset = Dataset::new(df!["amount" => amount].unwrap());
    let result = deterministic_engine().run_quis_analysis(&dataset, Some("single-column"));

    assert_eq!(result.summary.rows, 500);
    assert_eq!(result.summary.columns, 1);
    assert!(result.deep_insights.is_empty());
    assert!(result.simpson_paradoxes.is_empty());
    assert!(result.exploratory_correlations.is_empty());
    assert!(result.basic_insights.iter().any(|f| matches!(
        f,
        Finding::Distribution { column, n: 500, .. } if column == "amount"
    )));
    assert_eq!(result.summary.basic_insight_count, result.basic_insights.len());
}

#[test]
fn test_failing_generator_falls_back_to_heuristics() {
    let dataset = Dataset::new(regional());
    let with_failing = InsightEngine::builder()
        .config(InsightConfig::builder().use_ai_questions(true).build().unwrap())
        .question_generator(Arc::new(UnavailableGenerator))
        .build()
        .unwrap();

    let fallback = with_failing.run_quis_analysis(&dataset, None);
    let heuristic = deterministic_engine().run_quis_analysis(&dataset, None);

    assert!(!fallback.question_answers.is_empty());
    let texts = |r: &QuisResult| -> Vec<String> {
        r.question_answers.iter().map(|a| a.question.text.clone()).collect()
    };
    assert_eq!(texts(&fallback), texts(&heuristic));
    assert!(fallback.question_answers.iter().all(|a| a.source == "heuristic"));
    assert_eq!(fallback.deep_insights, heuristic.deep_insights);
    assert_eq!(fallback.summary.hypotheses_tested, heuristic.summary.hypotheses_tested);
}

#[test]
fn test_single_row_dataset() {
    let frame = df!["x" => [1.0], "label" => ["only"]].unwrap();
    let result = deterministic_engine().run_quis_analysis(&Dataset::new(frame), None);

    assert_eq!(result.summary.rows, 1);
    assert_eq!(result.summary.deep_insight_count, 0);
    assert_eq!(result.summary.by_significance.total(), 0);
}

#[test]
fn test_empty_groups_are_insufficient() {
    let result = compare_groups(&[
        ("a".to_string(), vec![1.0]),
        ("b".to_string(), vec![]),
    ]);
    assert!(matches!(result, ComparisonResult::InsufficientData { .. }));
}

#[test]
fn test_unknown_anomaly_method_is_an_error() {
    let engine = deterministic_engine();
    let err = engine
        .detect_anomalies(&with_extreme_values(), "amount", "lof")
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_ANOMALY_METHOD");
    assert!(err.is_configuration_error());

    let found = engine
        .detect_anomalies(&with_extreme_values(), "amount", "robust_z_score")
        .unwrap()
        .expect("enough values");
    assert_eq!(found.outlier_count, found.outlier_indices.len());
    assert_eq!(found.outlier_indices, vec![95, 96, 97, 98, 99]);
}

#[test]
fn test_shared_engine_across_threads() {
    let engine = Arc::new(deterministic_engine());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                engine
                    .run_quis_analysis(&perfectly_correlated(), Some("shared"))
                    .summary
                    .rows
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 100);
    }
    assert!(engine.computation_count() >= 1);
    assert_eq!(engine.cache().len(), 1);
}
