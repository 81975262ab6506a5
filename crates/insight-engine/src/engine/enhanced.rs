//! Enhanced analysis: question evaluation and false-discovery-rate control.
//!
//! Every question is answered with the same statistical modules the
//! deterministic path uses. Afterwards all p-values produced in the run
//! (pairwise correlations, subspace insights, answers) form one family for
//! the Benjamini-Hochberg procedure.

use crate::config::InsightConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::stats::BasicStatistics;
use crate::stats::correlation::{correlation_p_value, linear_slope, pearson};
use crate::stats::descriptive::{complete_pairs, is_constant};
use crate::subspace::index::{CategoryIndex, values_at};
use crate::testing::{HypothesisTester, benjamini_hochberg, rejected_at};
use crate::types::{
    AnalyticalQuestion, CorrelationResult, Finding, QuestionAnswer, QuestionIntent,
    QuestionOutcome, SubspaceInsight,
};
use std::collections::HashMap;
use tracing::debug;

/// Answer one question. Failures and insufficient data become `Unanswerable`.
pub fn evaluate_question(
    dataset: &Dataset,
    question: &AnalyticalQuestion,
    config: &InsightConfig,
) -> QuestionOutcome {
    let outcome = match &question.intent {
        QuestionIntent::Correlation { column_a, column_b } => {
            correlation_outcome(dataset, column_a, column_b, config)
        }
        QuestionIntent::GroupComparison {
            group_column,
            value_column,
        } => group_outcome(dataset, group_column, value_column, config),
        QuestionIntent::Trend {
            temporal_column,
            value_column,
        } => trend_outcome(dataset, temporal_column, value_column, config),
    };

    outcome.unwrap_or_else(|e| {
        debug!(question = %question.text, error = %e, "Question could not be evaluated");
        QuestionOutcome::Unanswerable {
            reason: e.to_string(),
        }
    })
}

/// p-value carried by an outcome, if any.
pub fn outcome_p_value(outcome: &QuestionOutcome) -> Option<f64> {
    match outcome {
        QuestionOutcome::Correlation(result) => result.p_value,
        QuestionOutcome::GroupComparison(comparison) => comparison.p_value(),
        QuestionOutcome::Trend { p_value, .. } => Some(*p_value),
        QuestionOutcome::Unanswerable { .. } => None,
    }
}

fn correlation_outcome(
    dataset: &Dataset,
    column_a: &str,
    column_b: &str,
    config: &InsightConfig,
) -> Result<QuestionOutcome> {
    let columns = vec![
        (column_a.to_string(), dataset.numeric_values(column_a)?),
        (column_b.to_string(), dataset.numeric_values(column_b)?),
    ];
    Ok(BasicStatistics::new(config)
        .correlations(&columns)
        .into_iter()
        .next()
        .map(QuestionOutcome::Correlation)
        .unwrap_or_else(|| unanswerable("too few complete pairs or a constant column")))
}

fn group_outcome(
    dataset: &Dataset,
    group_column: &str,
    value_column: &str,
    config: &InsightConfig,
) -> Result<QuestionOutcome> {
    let index = CategoryIndex::build(group_column, &dataset.string_values(group_column)?);
    let values = dataset.numeric_values(value_column)?;
    let groups: Vec<(String, Vec<f64>)> = index
        .values
        .iter()
        .map(|(name, rows)| (name.clone(), values_at(&values, rows)))
        .collect();

    let tester = HypothesisTester::new(config.alpha, config.min_group_size);
    Ok(QuestionOutcome::GroupComparison(tester.compare(&groups)))
}

fn trend_outcome(
    dataset: &Dataset,
    temporal_column: &str,
    value_column: &str,
    config: &InsightConfig,
) -> Result<QuestionOutcome> {
    let days = dataset.temporal_days(temporal_column)?;
    let values = dataset.numeric_values(value_column)?;
    let (x, y) = complete_pairs(&days, &values);
    if x.len() < config.min_pair_observations || is_constant(&x) || is_constant(&y) {
        return Ok(unanswerable("too few dated observations or no variation"));
    }

    Ok(estimate_trend(&x, &y).unwrap_or_else(|| unanswerable("trend could not be estimated")))
}

fn estimate_trend(days: &[f64], values: &[f64]) -> Option<QuestionOutcome> {
    let value = pearson(days, values)?;
    Some(QuestionOutcome::Trend {
        value,
        n: days.len(),
        p_value: correlation_p_value(value, days.len())?,
        slope_per_day: linear_slope(days, values)?,
    })
}

fn unanswerable(reason: &str) -> QuestionOutcome {
    QuestionOutcome::Unanswerable {
        reason: reason.to_string(),
    }
}

/// Result of the false-discovery-rate correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FdrSummary {
    pub hypotheses_tested: usize,
    pub significant_after_correction: usize,
}

/// Apply Benjamini-Hochberg across every p-value of one run and write the
/// adjusted values back.
///
/// `correlations` holds every evaluated pair; their adjusted values are
/// copied onto the matching correlations inside `findings` and
/// `exploratory`, which are views of the same pairs and are not counted
/// twice.
pub fn apply_fdr_correction(
    correlations: &[CorrelationResult],
    findings: &mut [Finding],
    exploratory: &mut [CorrelationResult],
    insights: &mut [SubspaceInsight],
    answers: &mut [QuestionAnswer],
    fdr_alpha: f64,
) -> FdrSummary {
    let mut pairs = Vec::new();
    let mut p_values = Vec::new();
    for c in correlations {
        if let Some(p) = c.p_value {
            pairs.push((c.column_a.as_str(), c.column_b.as_str()));
            p_values.push(p);
        }
    }
    p_values.extend(insights.iter().filter_map(|i| i.p_value));
    p_values.extend(answers.iter().filter_map(|a| a.p_value));

    if p_values.is_empty() {
        return FdrSummary::default();
    }
    let adjusted = benjamini_hochberg(&p_values);
    let significant = rejected_at(&adjusted, fdr_alpha)
        .into_iter()
        .filter(|rejected| *rejected)
        .count();

    let by_pair: HashMap<(&str, &str), f64> = pairs
        .iter()
        .copied()
        .zip(adjusted.iter().copied())
        .collect();
    let set_pair = |c: &mut CorrelationResult| {
        if let Some(p) = by_pair.get(&(c.column_a.as_str(), c.column_b.as_str())) {
            c.adjusted_p_value = Some(*p);
        }
    };
    for finding in findings.iter_mut() {
        if let Finding::StrongCorrelation(c) = finding {
            set_pair(c);
        }
    }
    exploratory.iter_mut().for_each(set_pair);

    // Same order as the p-values were collected in.
    let mut rest = adjusted[pairs.len()..].iter().copied();
    for insight in insights.iter_mut().filter(|i| i.p_value.is_some()) {
        insight.adjusted_p_value = rest.next();
    }
    for answer in answers.iter_mut().filter(|a| a.p_value.is_some()) {
        answer.adjusted_p_value = rest.next();
    }

    debug!(
        hypotheses = p_values.len(),
        significant, fdr_alpha, "Benjamini-Hochberg correction applied"
    );
    FdrSummary {
        hypotheses_tested: p_values.len(),
        significant_after_correction: significant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ComparisonResult, CorrelationMethod, FilterCondition, InsightDetail, InsightKind,
        Significance, Strength, TestKind,
    };
    use polars::prelude::*;

    fn dataset() -> Dataset {
        let n = 40;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        let group: Vec<&str> = (0..n).map(|i| if i < 20 { "low" } else { "high" }).collect();
        let dates: Vec<String> = (0..n).map(|i| format!("2024-01-{:02}", i % 28 + 1)).collect();
        let frame = df![
            "x" => x,
            "y" => y,
            "group" => group,
            "date" => dates,
        ]
        .unwrap();
        Dataset::new(frame)
    }

    fn question(intent: QuestionIntent) -> AnalyticalQuestion {
        AnalyticalQuestion {
            text: "?".to_string(),
            intent,
        }
    }

    fn correlation(a: &str, b: &str, p: f64) -> CorrelationResult {
        CorrelationResult {
            column_a: a.to_string(),
            column_b: b.to_string(),
            method: CorrelationMethod::Linear,
            value: 0.5,
            n: 30,
            p_value: Some(p),
            adjusted_p_value: None,
            strength: Strength::Moderate,
        }
    }

    // ===== evaluate_question tests =====

    #[test]
    fn test_correlation_question() {
        let config = InsightConfig::default();
        let outcome = evaluate_question(
            &dataset(),
            &question(QuestionIntent::Correlation {
                column_a: "x".to_string(),
                column_b: "y".to_string(),
            }),
            &config,
        );
        let QuestionOutcome::Correlation(result) = &outcome else {
            panic!("expected correlation, got {:?}", outcome);
        };
        assert!((result.value - 1.0).abs() < 1e-9);
        assert!(outcome_p_value(&outcome).unwrap() < 1e-10);
    }

    #[test]
    fn test_group_question() {
        let config = InsightConfig::default();
        let outcome = evaluate_question(
            &dataset(),
            &question(QuestionIntent::GroupComparison {
                group_column: "group".to_string(),
                value_column: "x".to_string(),
            }),
            &config,
        );
        let QuestionOutcome::GroupComparison(ComparisonResult::Tested(comparison)) = &outcome else {
            panic!("expected a tested comparison, got {:?}", outcome);
        };
        assert_eq!(comparison.groups.len(), 2);
        assert!(matches!(comparison.test.test, TestKind::WelchT | TestKind::MannWhitneyU));
        assert!(comparison.test.reject_null);
    }

    #[test]
    fn test_trend_question() {
        let config = InsightConfig::default();
        let outcome = evaluate_question(
            &dataset(),
            &question(QuestionIntent::Trend {
                temporal_column: "date".to_string(),
                value_column: "x".to_string(),
            }),
            &config,
        );
        let QuestionOutcome::Trend { n, p_value, .. } = outcome else {
            panic!("expected a trend, got {:?}", outcome);
        };
        assert_eq!(n, 40);
        assert!((0.0..=1.0).contains(&p_value));
    }

    #[test]
    fn test_unknown_column_is_unanswerable() {
        let config = InsightConfig::default();
        let outcome = evaluate_question(
            &dataset(),
            &question(QuestionIntent::Correlation {
                column_a: "x".to_string(),
                column_b: "missing".to_string(),
            }),
            &config,
        );
        assert!(matches!(outcome, QuestionOutcome::Unanswerable { .. }));
        assert_eq!(outcome_p_value(&outcome), None);
    }

    // ===== apply_fdr_correction tests =====

    #[test]
    fn test_fdr_writes_back_to_every_view() {
        let correlations = vec![correlation("a", "b", 0.01), correlation("a", "c", 0.04)];
        let mut findings = vec![Finding::StrongCorrelation(correlations[0].clone())];
        let mut exploratory = correlations.clone();
        let mut insights = vec![SubspaceInsight {
            kind: InsightKind::SubspaceCorrelation,
            filter: vec![FilterCondition::new("region", "East")],
            subspace_size: 25,
            detail: InsightDetail::Correlation {
                column_a: "a".to_string(),
                column_b: "c".to_string(),
                method: CorrelationMethod::Linear,
                base_value: 0.4,
                subspace_value: 0.9,
            },
            improvement: 0.5,
            significance: Significance::High,
            p_value: Some(0.03),
            adjusted_p_value: None,
        }];
        let mut answers = vec![QuestionAnswer {
            question: question(QuestionIntent::Correlation {
                column_a: "a".to_string(),
                column_b: "b".to_string(),
            }),
            outcome: QuestionOutcome::Unanswerable {
                reason: "n/a".to_string(),
            },
            p_value: Some(0.005),
            adjusted_p_value: None,
            source: "heuristic".to_string(),
        }];

        let summary = apply_fdr_correction(
            &correlations,
            &mut findings,
            &mut exploratory,
            &mut insights,
            &mut answers,
            0.05,
        );
        // p = [0.01, 0.04, 0.03, 0.005] -> adjusted [0.02, 0.04, 0.04, 0.02]
        assert_eq!(summary.hypotheses_tested, 4);
        assert_eq!(summary.significant_after_correction, 4);

        let Finding::StrongCorrelation(strong) = &findings[0] else {
            unreachable!()
        };
        assert!((strong.adjusted_p_value.unwrap() - 0.02).abs() < 1e-12);
        assert!((exploratory[1].adjusted_p_value.unwrap() - 0.04).abs() < 1e-12);
        assert!((insights[0].adjusted_p_value.unwrap() - 0.04).abs() < 1e-12);
        assert!((answers[0].adjusted_p_value.unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_fdr_without_p_values() {
        let summary = apply_fdr_correction(&[], &mut [], &mut [], &mut [], &mut [], 0.05);
        assert_eq!(summary, FdrSummary::default());
    }
}
