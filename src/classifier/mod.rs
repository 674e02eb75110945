pub mod http;

pub use http::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{NOISE_FLOOR, TOP_CANDIDATES};
use crate::vocabulary::SymptomVector;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Classifier is not reachable at {0}")]
    Connection(String),

    #[error("Classifier request timed out after {0}s")]
    Timeout(u64),

    #[error("Classifier returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),

    #[error("Vector length {actual} does not match expected input size {expected}")]
    VectorLength { expected: usize, actual: usize },
}

/// One raw classifier output, in the classifier's own label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f64,
}

impl LabelScore {
    pub fn new(label: &str, probability: f64) -> Self {
        Self {
            label: label.to_string(),
            probability,
        }
    }
}

/// A disease label that survived the top-k and noise-floor filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDisease {
    pub label: String,
    pub probability: f64,
}

/// Opaque probabilistic classifier over a closed disease set.
pub trait DiseaseClassifier: Send + Sync {
    /// Probabilities for every label, in classifier index order.
    fn predict(&self, vector: &SymptomVector) -> Result<Vec<LabelScore>, ClassifierError>;
}

/// Sort descending by probability (ties: classifier index ascending), keep the top
/// three, then drop anything at or below the noise floor.
pub fn select_candidates(scores: &[LabelScore]) -> Vec<CandidateDisease> {
    let mut indexed: Vec<(usize, &LabelScore)> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.probability.is_finite())
        .collect();

    indexed.sort_by(|(ia, a), (ib, b)| {
        b.probability
            .total_cmp(&a.probability)
            .then_with(|| ia.cmp(ib))
    });

    indexed
        .into_iter()
        .take(TOP_CANDIDATES)
        .filter(|(_, s)| s.probability > NOISE_FLOOR)
        .map(|(_, s)| CandidateDisease {
            label: s.label.clone(),
            probability: s.probability,
        })
        .collect()
}

/// Mock classifier for testing. Returns configured scores or a configured error.
pub struct MockClassifier {
    response: Result<Vec<LabelScore>, ClassifierError>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            response: Ok(scores.iter().map(|(l, p)| LabelScore::new(l, *p)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ClassifierError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `predict` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiseaseClassifier for MockClassifier {
    fn predict(&self, _vector: &SymptomVector) -> Result<Vec<LabelScore>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}
