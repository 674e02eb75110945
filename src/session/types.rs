use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::CandidateDisease;
use crate::vocabulary::{SymptomId, VocabularyError};

// ---------------------------------------------------------------------------
// Phase and answers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Input,
    Refinement,
    Final,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Refinement => "refinement",
            Self::Final => "final",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply to a follow-up question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    /// Stop asking and take the current best candidate.
    Skip,
}

impl Answer {
    /// Parse a typed or transcribed reply in English, Hindi or Gujarati.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "y" | "yes" | "haan" | "ha" | "हाँ" | "हां" | "હા" => Some(Self::Yes),
            "n" | "no" | "nahi" | "na" | "नहीं" | "ना" | "ના" => Some(Self::No),
            "s" | "skip" | "done" | "finish" => Some(Self::Skip),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result carried by a Final session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Disease { label: String, probability: f64 },
    /// Inference was not possible; see the session's [`InferenceNotice`].
    Unknown,
}

impl Verdict {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Disease { label, .. } => Some(label),
            Self::Unknown => None,
        }
    }

    pub(crate) fn from_candidate(candidate: &CandidateDisease) -> Self {
        Self::Disease {
            label: candidate.label.clone(),
            probability: candidate.probability,
        }
    }
}

/// Why a session ended without a disease.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum InferenceNotice {
    /// The classifier call failed; not retried.
    ClassifierUnavailable(String),
    /// Nothing cleared the noise floor.
    NoCandidates,
}

impl InferenceNotice {
    pub fn message(&self) -> String {
        match self {
            Self::ClassifierUnavailable(reason) => {
                format!("The prediction service is unavailable ({reason}). Please try again later.")
            }
            Self::NoCandidates => {
                "No condition matched these symptoms with enough confidence. \
                 Please consult a doctor."
                    .to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Per-session diagnostic state. Only the engine mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub(super) session_id: Uuid,
    pub(super) known: BTreeSet<SymptomId>,
    pub(super) asked: BTreeSet<SymptomId>,
    pub(super) candidates: Vec<CandidateDisease>,
    pub(super) phase: Phase,
    pub(super) question: Option<SymptomId>,
    pub(super) result: Option<Verdict>,
    pub(super) notice: Option<InferenceNotice>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            known: BTreeSet::new(),
            asked: BTreeSet::new(),
            candidates: Vec::new(),
            phase: Phase::Input,
            question: None,
            result: None,
            notice: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn known(&self) -> &BTreeSet<SymptomId> {
        &self.known
    }

    pub fn asked(&self) -> &BTreeSet<SymptomId> {
        &self.asked
    }

    pub fn candidates(&self) -> &[CandidateDisease] {
        &self.candidates
    }

    /// Symptom currently being asked about (Refinement only).
    pub fn question(&self) -> Option<&SymptomId> {
        self.question.as_ref()
    }

    pub fn result(&self) -> Option<&Verdict> {
        self.result.as_ref()
    }

    pub fn notice(&self) -> Option<&InferenceNotice> {
        self.notice.as_ref()
    }

    /// Everything except the session id, back to a fresh Input state.
    pub(super) fn clear(&mut self) {
        self.known.clear();
        self.asked.clear();
        self.candidates.clear();
        self.phase = Phase::Input;
        self.question = None;
        self.result = None;
        self.notice = None;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending question rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub symptom: SymptomId,
    pub text: String,
}

/// Read-only view published after each transition.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub candidates: Vec<CandidateDisease>,
    pub known: Vec<SymptomId>,
    pub question: Option<QuestionView>,
    pub result: Option<Verdict>,
    pub notice: Option<InferenceNotice>,
    pub published_at: chrono::NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Errors and engine trait
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No symptoms selected")]
    EmptySymptoms,

    #[error("Symptom not in vocabulary: {0}")]
    InvalidSymptom(String),

    #[error("Cannot {operation} while in {phase} phase")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Reference dataset columns do not match the vocabulary")]
    DatasetMismatch,
}

impl From<VocabularyError> for SessionError {
    fn from(err: VocabularyError) -> Self {
        match err {
            VocabularyError::UnknownSymptom(name) => Self::InvalidSymptom(name),
            other => Self::InvalidSymptom(other.to_string()),
        }
    }
}

/// Input → Refinement → Final state machine over an explicit [`SessionState`].
pub trait DiagnosisEngine {
    /// Fresh session in the Input phase.
    fn start_session(&self) -> SessionState;

    /// Classify a committed symptom set. Input phase only.
    fn classify(
        &self,
        state: &mut SessionState,
        symptoms: &BTreeSet<SymptomId>,
    ) -> Result<Phase, SessionError>;

    /// Answer the pending question. Refinement phase only.
    fn answer(&self, state: &mut SessionState, answer: Answer) -> Result<Phase, SessionError>;

    /// Stop refining and take the top candidate. Refinement phase only.
    fn finish_now(&self, state: &mut SessionState) -> Result<Phase, SessionError>;

    /// Back to Input from any phase.
    fn reset(&self, state: &mut SessionState);

    /// Published view, with the pending question rendered in `language`.
    fn snapshot(&self, state: &SessionState, language: &str) -> SessionSnapshot;
}
