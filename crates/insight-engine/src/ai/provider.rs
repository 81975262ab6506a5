//! Question generator trait for the enhanced analysis path.
//!
//! A [`QuestionGenerator`] proposes analytical questions about a dataset
//! from its column profiles and the correlations the basic statistics
//! found. The engine evaluates each question with its own statistical
//! modules, so a generator never computes anything itself.
//!
//! # Implementing a New Generator
//!
//! 1. Create a new file in `src/ai/` (e.g., `ollama.rs`)
//! 2. Implement the [`QuestionGenerator`] trait for your generator struct
//! 3. Export the generator in `src/ai/mod.rs`
//!
//! # Example
//!
//! ```rust,ignore
//! use insight_engine::ai::OpenRouterQuestionGenerator;
//! use insight_engine::InsightEngine;
//! use std::sync::Arc;
//!
//! let generator = Arc::new(OpenRouterQuestionGenerator::new("your-api-key")?);
//! let engine = InsightEngine::builder()
//!     .question_generator(generator)
//!     .build()?;
//! ```

use crate::types::{AnalyticalQuestion, ColumnProfile, CorrelationResult, LogicalType, QuestionIntent};
use anyhow::Result;

/// What a generator knows about the dataset.
#[derive(Debug, Clone, Copy)]
pub struct QuestionContext<'a> {
    pub profiles: &'a [ColumnProfile],
    /// Correlations worth a second look (exploratory band).
    pub correlations: &'a [CorrelationResult],
    pub max_questions: usize,
}

impl<'a> QuestionContext<'a> {
    pub fn new(
        profiles: &'a [ColumnProfile],
        correlations: &'a [CorrelationResult],
        max_questions: usize,
    ) -> Self {
        Self {
            profiles,
            correlations,
            max_questions,
        }
    }

    /// Logical type of `column`, if the dataset has it.
    pub fn logical_type(&self, column: &str) -> Option<LogicalType> {
        self.profiles
            .iter()
            .find(|p| p.name == column)
            .map(|p| p.logical_type)
    }

    /// Whether the question refers to columns of the right logical types.
    ///
    /// Generated questions are untrusted input; anything that fails this
    /// check is dropped before evaluation.
    pub fn is_answerable(&self, question: &AnalyticalQuestion) -> bool {
        let is = |column: &str, accepted: &[LogicalType]| {
            self.logical_type(column)
                .is_some_and(|t| accepted.contains(&t))
        };
        match &question.intent {
            QuestionIntent::Correlation { column_a, column_b } => {
                column_a != column_b
                    && is(column_a, &[LogicalType::Numeric])
                    && is(column_b, &[LogicalType::Numeric])
            }
            QuestionIntent::GroupComparison {
                group_column,
                value_column,
            } => {
                is(group_column, &[LogicalType::Categorical, LogicalType::Boolean])
                    && is(value_column, &[LogicalType::Numeric])
            }
            QuestionIntent::Trend {
                temporal_column,
                value_column,
            } => {
                is(temporal_column, &[LogicalType::Temporal])
                    && is(value_column, &[LogicalType::Numeric])
            }
        }
    }
}

/// Source of analytical questions.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one generator is shared by every
/// analysis run of an engine.
///
/// # Error Handling
///
/// Implementations return meaningful errors via `anyhow::Result`. The
/// engine falls back to the heuristic generator when a generator fails or
/// returns nothing usable.
pub trait QuestionGenerator: Send + Sync {
    /// Propose at most `context.max_questions` questions.
    fn generate_questions(&self, context: &QuestionContext<'_>) -> Result<Vec<AnalyticalQuestion>>;

    /// Generator name, recorded as the source of each answer.
    fn name(&self) -> &str;

    /// The model behind the generator, if any.
    fn model(&self) -> Option<&str> {
        None
    }
}
