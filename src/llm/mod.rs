//! Text-generation service used for AI symptom extraction and info localization.
//!
//! The service is untrusted: callers must validate everything it returns.

pub mod ollama;

pub use ollama::*;

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Matches a fenced code block, with or without a language tag.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("Invalid code fence pattern"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Ollama is not running at {0}")]
    Connection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("No compatible model available")]
    NoModelAvailable,
}

/// LLM client abstraction (allows mocking)
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;

    /// Whether `model` (or a tagged variant of it) is installed on the service.
    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;
}

/// Body of the first fenced code block, or the whole response when unfenced.
pub fn strip_code_fence(response: &str) -> &str {
    CODE_FENCE
        .captures(response)
        .and_then(|c| c.get(1))
        .map_or(response, |m| m.as_str())
        .trim()
}
