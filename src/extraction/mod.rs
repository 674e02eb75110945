//! Symptom extraction front-end.
//!
//! Turns typed text or a speech transcript into a canonical symptom set:
//! a deterministic local matcher always runs, an AI matcher runs when
//! configured, and the union is staged into the session's selection buffer.

pub mod types;
pub mod local;
pub mod ai;
pub mod speech;
pub mod selection;
pub mod orchestrator;

pub use types::*;
pub use local::*;
pub use ai::*;
pub use speech::*;
pub use selection::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed extractor response: {0}")]
    MalformedResponse(String),
}
