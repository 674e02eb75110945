//! Symptom vocabulary: the fixed, ordered list of canonical symptom identifiers.
//!
//! Vocabulary order defines the one-hot vector layout sent to the classifier and
//! the tie-break order used by the discriminator. It never changes after load.

pub mod translation;

pub use translation::*;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("Vocabulary is empty")]
    Empty,

    #[error("Duplicate symptom in vocabulary: {0}")]
    Duplicate(String),

    #[error("Symptom not in vocabulary: {0}")]
    UnknownSymptom(String),

    #[error("Failed to read vocabulary {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse vocabulary {0}: {1}")]
    Parse(String, String),
}

/// Lowercase, trim and collapse inner whitespace. Shared by every matcher so that
/// vocabulary terms, translation phrases and user text compare on equal footing.
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical symptom token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomId(String);

impl SymptomId {
    pub fn new(raw: &str) -> Self {
        Self(normalize_term(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymptomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymptomId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Fixed-length {0,1} encoding of a symptom set in vocabulary order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymptomVector(Vec<u8>);

impl SymptomVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.0.get(index).is_some_and(|v| *v == 1)
    }

    /// Number of symptoms present.
    pub fn count_present(&self) -> usize {
        self.0.iter().filter(|v| **v == 1).count()
    }
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<SymptomId>,
    index: HashMap<SymptomId, usize>,
}

impl Vocabulary {
    pub fn new<I, S>(terms: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();

        for raw in terms {
            let id = SymptomId::new(raw.as_ref());
            if id.as_str().is_empty() {
                continue;
            }
            if index.contains_key(&id) {
                return Err(VocabularyError::Duplicate(id.0));
            }
            index.insert(id.clone(), ordered.len());
            ordered.push(id);
        }

        if ordered.is_empty() {
            return Err(VocabularyError::Empty);
        }

        Ok(Self {
            terms: ordered,
            index,
        })
    }

    /// Load from a JSON array of symptom names.
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VocabularyError::Load(path.display().to_string(), e.to_string()))?;
        let terms: Vec<String> = serde_json::from_str(&raw)
            .map_err(|e| VocabularyError::Parse(path.display().to_string(), e.to_string()))?;
        Self::new(terms)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[SymptomId] {
        &self.terms
    }

    pub fn index_of(&self, symptom: &SymptomId) -> Option<usize> {
        self.index.get(symptom).copied()
    }

    pub fn contains(&self, symptom: &SymptomId) -> bool {
        self.index.contains_key(symptom)
    }

    /// Resolve free text to a vocabulary member, if it names one exactly.
    pub fn resolve(&self, raw: &str) -> Option<SymptomId> {
        let id = SymptomId::new(raw);
        self.contains(&id).then_some(id)
    }

    /// One-hot encode a symptom set. Unknown symptoms are rejected rather than dropped.
    pub fn encode(&self, symptoms: &BTreeSet<SymptomId>) -> Result<SymptomVector, VocabularyError> {
        let mut vector = vec![0u8; self.terms.len()];
        for symptom in symptoms {
            let idx = self
                .index_of(symptom)
                .ok_or_else(|| VocabularyError::UnknownSymptom(symptom.to_string()))?;
            vector[idx] = 1;
        }
        Ok(SymptomVector(vector))
    }

    /// Order a symptom set by vocabulary position (display and prompt building).
    pub fn sorted(&self, symptoms: &BTreeSet<SymptomId>) -> Vec<SymptomId> {
        let mut out: Vec<SymptomId> = symptoms.iter().cloned().collect();
        out.sort_by_key(|s| self.index_of(s).unwrap_or(usize::MAX));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::new(["fever", "cough", "headache", "stomach pain"]).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<SymptomId> {
        items.iter().map(|s| SymptomId::new(s)).collect()
    }

    #[test]
    fn normalize_lowercases_and_collapses() {
        assert_eq!(normalize_term("  Stomach   PAIN "), "stomach pain");
        assert_eq!(normalize_term(""), "");
    }

    #[test]
    fn keeps_load_order() {
        let v = vocab();
        assert_eq!(v.len(), 4);
        assert_eq!(v.terms()[0].as_str(), "fever");
        assert_eq!(v.index_of(&SymptomId::new("headache")), Some(2));
    }

    #[test]
    fn rejects_duplicates_after_normalization() {
        let err = Vocabulary::new(["Fever", "fever "]).unwrap_err();
        assert!(matches!(err, VocabularyError::Duplicate(ref s) if s == "fever"));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            Vocabulary::new(Vec::<String>::new()).unwrap_err(),
            VocabularyError::Empty
        ));
        assert!(matches!(
            Vocabulary::new(["  "]).unwrap_err(),
            VocabularyError::Empty
        ));
    }

    #[test]
    fn encode_sets_exactly_member_indices() {
        let v = vocab();
        let cases = [
            set(&[]),
            set(&["fever"]),
            set(&["cough", "stomach pain"]),
            set(&["fever", "cough", "headache", "stomach pain"]),
        ];
        for symptoms in cases {
            let vector = v.encode(&symptoms).unwrap();
            assert_eq!(vector.len(), v.len());
            for (i, term) in v.terms().iter().enumerate() {
                assert_eq!(vector.is_set(i), symptoms.contains(term), "index {i}");
            }
            assert_eq!(vector.count_present(), symptoms.len());
        }
    }

    #[test]
    fn encode_rejects_unknown_symptom() {
        let err = vocab().encode(&set(&["fever", "glowing"])).unwrap_err();
        assert!(matches!(err, VocabularyError::UnknownSymptom(ref s) if s == "glowing"));
    }

    #[test]
    fn resolve_normalizes() {
        let v = vocab();
        assert_eq!(v.resolve(" Headache"), Some(SymptomId::new("headache")));
        assert_eq!(v.resolve("migraine"), None);
    }

    #[test]
    fn sorted_follows_vocabulary_order() {
        let v = vocab();
        let ordered = v.sorted(&set(&["stomach pain", "fever", "cough"]));
        let names: Vec<&str> = ordered.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["fever", "cough", "stomach pain"]);
    }

    #[test]
    fn load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabulary.json");
        std::fs::write(&path, r#"["fever", "Cough", "headache"]"#).unwrap();

        let v = Vocabulary::load(&path).unwrap();
        assert_eq!(v.len(), 3);
        assert!(v.contains(&SymptomId::new("cough")));
    }

    #[test]
    fn load_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabulary.json");
        std::fs::write(&path, r#"{"fever": 1}"#).unwrap();
        assert!(matches!(
            Vocabulary::load(&path).unwrap_err(),
            VocabularyError::Parse(..)
        ));
    }
}
