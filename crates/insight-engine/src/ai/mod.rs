//! Question generation for the enhanced analysis path.
//!
//! The enhanced path asks a [`QuestionGenerator`] for analytical questions
//! and answers each one with the engine's own statistical modules.
//!
//! # Feature Flag
//!
//! The [`QuestionGenerator`] trait and the [`HeuristicQuestionGenerator`]
//! are always available. The model-backed generator requires the `ai`
//! feature flag.
//!
//! ```toml
//! # Enable the OpenRouter generator (default)
//! insight-engine = { version = "0.1", features = ["ai"] }
//!
//! # Heuristic questions only, no HTTP client
//! insight-engine = { version = "0.1", default-features = false }
//! ```
//!
//! # Generators
//!
//! - [`HeuristicQuestionGenerator`] - deterministic, built from column types
//! - [`OpenRouterQuestionGenerator`] - OpenRouter API (requires `ai` feature)

mod heuristic;
mod provider;

pub use heuristic::HeuristicQuestionGenerator;
pub use provider::{QuestionContext, QuestionGenerator};

#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use openrouter::{
    API_KEY_ENV, OpenRouterConfig, OpenRouterConfigBuilder, OpenRouterQuestionGenerator,
};
