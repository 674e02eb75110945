//! Outcome type for calls into untrusted external services.
//!
//! AI extraction, translation and speech recognition may be unreachable or return
//! garbage. Callers get one of three answers and must handle the degraded path
//! explicitly instead of catching an error after the fact.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ServiceOutcome<T> {
    /// The service answered and the answer passed validation.
    Ok(T),
    /// The service failed; `value` is the deterministic local fallback.
    Degraded { value: T, reason: String },
    /// The service failed and there is no fallback value.
    Failed { reason: String },
}

impl<T> ServiceOutcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The usable value, whether fresh or fallback.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } | Self::Failed { reason } => Some(reason),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ServiceOutcome<U> {
        match self {
            Self::Ok(value) => ServiceOutcome::Ok(f(value)),
            Self::Degraded { value, reason } => ServiceOutcome::Degraded {
                value: f(value),
                reason,
            },
            Self::Failed { reason } => ServiceOutcome::Failed { reason },
        }
    }
}
