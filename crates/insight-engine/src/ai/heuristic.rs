//! Deterministic question generator.
//!
//! Used when no model-backed generator is configured, when AI questions are
//! disabled, and as the fallback when a model-backed generator fails.

use super::provider::{QuestionContext, QuestionGenerator};
use crate::types::{AnalyticalQuestion, LogicalType, QuestionIntent};
use anyhow::Result;

/// Builds questions from column types and the exploratory correlations.
///
/// Questions are produced round-robin over three families so that a small
/// budget still covers each of them:
///
/// - correlation questions, one per exploratory correlation (strongest first)
/// - group comparisons, categorical or boolean column against numeric column
/// - trends, temporal column against numeric column
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicQuestionGenerator;

impl HeuristicQuestionGenerator {
    pub fn new() -> Self {
        Self
    }

    fn correlation_questions(context: &QuestionContext<'_>) -> Vec<AnalyticalQuestion> {
        let mut correlations: Vec<_> = context.correlations.iter().collect();
        correlations.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
        correlations
            .into_iter()
            .map(|c| AnalyticalQuestion {
                text: format!("How are {} and {} related?", c.column_a, c.column_b),
                intent: QuestionIntent::Correlation {
                    column_a: c.column_a.clone(),
                    column_b: c.column_b.clone(),
                },
            })
            .collect()
    }

    fn group_questions(context: &QuestionContext<'_>) -> Vec<AnalyticalQuestion> {
        let groups = names(context, &[LogicalType::Categorical, LogicalType::Boolean]);
        let numeric = names(context, &[LogicalType::Numeric]);
        let mut questions = Vec::new();
        for group in &groups {
            for value in &numeric {
                questions.push(AnalyticalQuestion {
                    text: format!("Does {} differ across {}?", value, group),
                    intent: QuestionIntent::GroupComparison {
                        group_column: group.to_string(),
                        value_column: value.to_string(),
                    },
                });
            }
        }
        questions
    }

    fn trend_questions(context: &QuestionContext<'_>) -> Vec<AnalyticalQuestion> {
        let temporal = names(context, &[LogicalType::Temporal]);
        let numeric = names(context, &[LogicalType::Numeric]);
        let mut questions = Vec::new();
        for time in &temporal {
            for value in &numeric {
                questions.push(AnalyticalQuestion {
                    text: format!("How does {} change over {}?", value, time),
                    intent: QuestionIntent::Trend {
                        temporal_column: time.to_string(),
                        value_column: value.to_string(),
                    },
                });
            }
        }
        questions
    }
}

impl QuestionGenerator for HeuristicQuestionGenerator {
    fn generate_questions(&self, context: &QuestionContext<'_>) -> Result<Vec<AnalyticalQuestion>> {
        let mut families = [
            Self::correlation_questions(context).into_iter(),
            Self::group_questions(context).into_iter(),
            Self::trend_questions(context).into_iter(),
        ];

        let mut questions = Vec::with_capacity(context.max_questions);
        while questions.len() < context.max_questions {
            let mut progressed = false;
            for family in families.iter_mut() {
                if questions.len() >= context.max_questions {
                    break;
                }
                if let Some(question) = family.next() {
                    questions.push(question);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        Ok(questions)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

fn names<'a>(context: &QuestionContext<'a>, types: &[LogicalType]) -> Vec<&'a str> {
    context
        .profiles
        .iter()
        .filter(|p| types.contains(&p.logical_type))
        .map(|p| p.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnProfile, CorrelationMethod, CorrelationResult, Strength};

    fn profile(name: &str, logical_type: LogicalType) -> ColumnProfile {
        ColumnProfile {
            name: name.to_string(),
            dtype: "str".to_string(),
            logical_type,
            null_count: 0,
            unique_count: 3,
            cardinality_ratio: 0.1,
            declared: false,
        }
    }

    fn correlation(a: &str, b: &str, value: f64) -> CorrelationResult {
        CorrelationResult {
            column_a: a.to_string(),
            column_b: b.to_string(),
            method: CorrelationMethod::Linear,
            value,
            n: 50,
            p_value: Some(0.01),
            adjusted_p_value: None,
            strength: Strength::Moderate,
        }
    }

    #[test]
    fn test_round_robin_covers_every_family() {
        let profiles = vec![
            profile("price", LogicalType::Numeric),
            profile("quantity", LogicalType::Numeric),
            profile("region", LogicalType::Categorical),
            profile("date", LogicalType::Temporal),
        ];
        let correlations = vec![correlation("price", "quantity", 0.4)];
        let context = QuestionContext::new(&profiles, &correlations, 3);

        let questions = HeuristicQuestionGenerator.generate_questions(&context).unwrap();
        assert_eq!(questions.len(), 3);
        assert!(matches!(questions[0].intent, QuestionIntent::Correlation { .. }));
        assert!(matches!(questions[1].intent, QuestionIntent::GroupComparison { .. }));
        assert!(matches!(questions[2].intent, QuestionIntent::Trend { .. }));
        assert!(questions.iter().all(|q| context.is_answerable(q)));
    }

    #[test]
    fn test_strongest_correlation_first() {
        let profiles = vec![
            profile("a", LogicalType::Numeric),
            profile("b", LogicalType::Numeric),
            profile("c", LogicalType::Numeric),
        ];
        let correlations = vec![correlation("a", "b", 0.35), correlation("a", "c", -0.6)];
        let context = QuestionContext::new(&profiles, &correlations, 10);

        let questions = HeuristicQuestionGenerator.generate_questions(&context).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "How are a and c related?");
    }

    #[test]
    fn test_no_usable_columns() {
        let profiles = vec![profile("notes", LogicalType::Text)];
        let context = QuestionContext::new(&profiles, &[], 10);
        assert!(HeuristicQuestionGenerator.generate_questions(&context).unwrap().is_empty());
    }

    #[test]
    fn test_is_answerable_rejects_wrong_types() {
        let profiles = vec![
            profile("price", LogicalType::Numeric),
            profile("region", LogicalType::Categorical),
        ];
        let context = QuestionContext::new(&profiles, &[], 10);
        let swapped = AnalyticalQuestion {
            text: "?".to_string(),
            intent: QuestionIntent::GroupComparison {
                group_column: "price".to_string(),
                value_column: "region".to_string(),
            },
        };
        let self_pair = AnalyticalQuestion {
            text: "?".to_string(),
            intent: QuestionIntent::Correlation {
                column_a: "price".to_string(),
                column_b: "price".to_string(),
            },
        };
        assert!(!context.is_answerable(&swapped));
        assert!(!context.is_answerable(&self_pair));
    }
}
