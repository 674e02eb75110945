//! Diagnosis state machine: Input → Refinement → Final.

pub mod engine;
pub mod types;

pub use engine::*;
pub use types::*;
