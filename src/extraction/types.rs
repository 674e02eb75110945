use std::collections::BTreeSet;

use serde::Serialize;

use crate::vocabulary::SymptomId;

/// Which matcher contributed to a merged result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Local,
    Ai,
    Both,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Ai => "ai",
            Self::Both => "both",
        }
    }
}

/// Non-empty extraction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Union of local and AI matches.
    pub symptoms: BTreeSet<SymptomId>,
    pub local: BTreeSet<SymptomId>,
    pub ai: BTreeSet<SymptomId>,
    pub source: ExtractionSource,
    /// The AI pass was attempted and failed; only local matches were used.
    pub fallback_used: bool,
}

/// Outcome of one extraction pass.
///
/// `NothingMatched` is distinct from a user deliberately submitting no symptoms:
/// it means text was given but neither matcher recognized anything in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Matched(ExtractionReport),
    NothingMatched { fallback_used: bool },
}

impl ExtractionOutcome {
    pub fn symptoms(&self) -> Option<&BTreeSet<SymptomId>> {
        match self {
            Self::Matched(report) => Some(&report.symptoms),
            Self::NothingMatched { .. } => None,
        }
    }

    pub fn fallback_used(&self) -> bool {
        match self {
            Self::Matched(report) => report.fallback_used,
            Self::NothingMatched { fallback_used } => *fallback_used,
        }
    }

    /// User-facing message for the outcome.
    pub fn message(&self) -> String {
        match self {
            Self::Matched(report) => {
                let names: Vec<&str> = report.symptoms.iter().map(|s| s.as_str()).collect();
                let label = if report.fallback_used {
                    "Basic match detected"
                } else {
                    match report.source {
                        ExtractionSource::Local => "Matched",
                        ExtractionSource::Ai | ExtractionSource::Both => "AI detected",
                    }
                };
                format!("{label}: {}", names.join(", "))
            }
            Self::NothingMatched { .. } => "No symptoms detected. Please try describing them \
                differently or pick them from the list."
                .to_string(),
        }
    }
}
