//! OpenRouter question generator.
//!
//! This module provides [`OpenRouterQuestionGenerator`], which implements
//! [`QuestionGenerator`] on top of the OpenRouter chat completions API
//! (<https://openrouter.ai/>). The model is asked for a JSON array of
//! questions; anything that does not parse or refers to unknown columns is
//! discarded.

use super::provider::{QuestionContext, QuestionGenerator};
use crate::error::InsightError;
use crate::types::AnalyticalQuestion;
use anyhow::{Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default OpenRouter API endpoint.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model to use for question generation.
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default temperature for model responses (low for repeatable outputs).
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default max tokens for responses. A question list needs more room than a one-word answer.
const DEFAULT_MAX_TOKENS: u32 = 1200;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

/// Configuration for the OpenRouter generator.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// The model to use (e.g., "deepseek/deepseek-chat", "openai/gpt-4").
    pub model: String,
    /// Temperature for response generation (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL for the API (useful for proxies or custom endpoints).
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl OpenRouterConfig {
    /// Create a new configuration builder.
    pub fn builder() -> OpenRouterConfigBuilder {
        OpenRouterConfigBuilder::default()
    }
}

/// Builder for [`OpenRouterConfig`].
#[derive(Default)]
pub struct OpenRouterConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl OpenRouterConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> OpenRouterConfig {
        OpenRouterConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Question generator backed by an OpenRouter model.
///
/// # Example
///
/// ```rust,ignore
/// use insight_engine::ai::{OpenRouterConfig, OpenRouterQuestionGenerator};
///
/// // Key from OPENROUTER_API_KEY
/// let generator = OpenRouterQuestionGenerator::from_env()?;
///
/// // With custom configuration
/// let config = OpenRouterConfig::builder().model("openai/gpt-4").build();
/// let generator = OpenRouterQuestionGenerator::with_config("your-api-key", config)?;
/// ```
pub struct OpenRouterQuestionGenerator {
    api_key: String,
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterQuestionGenerator {
    /// Create a generator with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, OpenRouterConfig::default())
    }

    /// Create a generator with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    /// Create a generator from the `OPENROUTER_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| anyhow!("{} is not set", API_KEY_ENV))?;
        if key.trim().is_empty() {
            bail!("{} is empty", API_KEY_ENV);
        }
        Self::new(key)
    }

    fn build_prompt(&self, context: &QuestionContext<'_>) -> String {
        let mut prompt = String::from(
            "You are a data analyst. Propose analytical questions about a dataset.\n\n\
            COLUMNS (name: type, unique values):\n",
        );
        for profile in context.profiles {
            prompt.push_str(&format!(
                "- {}: {}, {} unique\n",
                profile.name, profile.logical_type, profile.unique_count
            ));
        }

        if !context.correlations.is_empty() {
            prompt.push_str("\nMODERATE CORRELATIONS:\n");
            for c in context.correlations {
                prompt.push_str(&format!(
                    "- {} ~ {}: {:.3} ({})\n",
                    c.column_a,
                    c.column_b,
                    c.value,
                    c.method.as_str()
                ));
            }
        }

        prompt.push_str(&format!(
            "\nReturn at most {} questions as a JSON array. Each element must be one of:\n\
            {{\"text\": \"...\", \"intent\": \"correlation\", \"column_a\": \"<numeric>\", \"column_b\": \"<numeric>\"}}\n\
            {{\"text\": \"...\", \"intent\": \"group_comparison\", \"group_column\": \"<categorical or boolean>\", \"value_column\": \"<numeric>\"}}\n\
            {{\"text\": \"...\", \"intent\": \"trend\", \"temporal_column\": \"<temporal>\", \"value_column\": \"<numeric>\"}}\n\n\
            CRITICAL: use only the column names listed above. Return ONLY the JSON array, no prose.\n",
            context.max_questions
        ));
        prompt
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        let request = OpenRouterRequest {
            model: self.config.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "insight-engine")
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(InsightError::QuestionGeneration(format!(
                "OpenRouter API Error {}: {}",
                response.status(),
                response.text()?
            ))
            .into());
        }

        let result: OpenRouterResponse = response.json()?;
        result
            .choices
            .as_ref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.message.as_ref())
            .map(|msg| msg.content.clone())
            .ok_or_else(|| {
                InsightError::QuestionGeneration("No response content from OpenRouter API".to_string())
                    .into()
            })
    }

    /// Parse the model reply into questions the context can answer.
    fn parse_questions(
        &self,
        response: &str,
        context: &QuestionContext<'_>,
    ) -> Result<Vec<AnalyticalQuestion>> {
        let start = response.find('[');
        let end = response.rfind(']');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &response[start..=end],
            _ => {
                return Err(
                    InsightError::QuestionGeneration("No JSON array in model response".to_string()).into(),
                );
            }
        };

        let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let total = raw.len();
        let questions: Vec<AnalyticalQuestion> = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value::<AnalyticalQuestion>(value).ok())
            .filter(|q| context.is_answerable(q))
            .take(context.max_questions)
            .collect();

        if questions.len() < total {
            debug!(
                kept = questions.len(),
                total, "Dropped malformed or unanswerable questions"
            );
        }
        if questions.is_empty() {
            return Err(
                InsightError::QuestionGeneration("Model returned no usable questions".to_string()).into(),
            );
        }
        Ok(questions)
    }
}

impl QuestionGenerator for OpenRouterQuestionGenerator {
    fn generate_questions(&self, context: &QuestionContext<'_>) -> Result<Vec<AnalyticalQuestion>> {
        let prompt = self.build_prompt(context);
        let response = self.call_api(&prompt).inspect_err(|e| {
            warn!("OpenRouter question generation failed: {}", e);
        })?;
        self.parse_questions(&response, context)
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================
