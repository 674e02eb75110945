//! Per-language phrase tables mapping local wording to canonical symptoms.
//!
//! Many phrases may map to one symptom. Tables loaded from `translations.json`
//! take precedence over the built-in colloquial tables for Hindi and Gujarati.
//! The reverse direction (canonical → local) is used to phrase follow-up
//! questions in the session language.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::{normalize_term, SymptomId, Vocabulary};

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Failed to read translations {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse translations {0}: {1}")]
    Parse(String, String),
}

/// Colloquial phrases heard in spoken Hindi input.
const HINDI_COLLOQUIAL: &[(&str, &str)] = &[
    ("सर में दर्द", "headache"),
    ("सर दर्द", "headache"),
    ("माथा दर्द", "headache"),
    ("पेट में दर्द", "stomach pain"),
    ("पेट दर्द", "stomach pain"),
    ("बुखार", "fever"),
    ("ताप", "fever"),
    ("बदन दर्द", "muscle pain"),
    ("शरीर दर्द", "muscle pain"),
    ("सांस फूलना", "shortness of breath"),
    ("सांस लेने में दिक्कत", "shortness of breath"),
    ("ठंड", "chills"),
    ("कपकपी", "chills"),
    ("उल्टी", "vomiting"),
    ("जी मिचलाना", "nausea"),
    ("दस्त", "diarrhea"),
    ("पेचिश", "diarrhea"),
    ("खांसी", "cough"),
    ("कमजोरी", "weakness"),
    ("थकान", "fatigue"),
    ("चक्कर", "dizziness"),
    ("खुजली", "itching of skin"),
    ("सूजन", "skin swelling"),
    ("जलन", "burning"),
    ("कब्ज", "constipation"),
];

/// Colloquial phrases heard in spoken Gujarati input.
const GUJARATI_COLLOQUIAL: &[(&str, &str)] = &[
    ("માથું દુખે", "headache"),
    ("માથાનો દુખાવો", "headache"),
    ("પેટમાં દુખે", "stomach pain"),
    ("પેટનો દુખાવો", "stomach pain"),
    ("તાવ", "fever"),
    ("શરીર દુખે", "muscle pain"),
    ("હાડકા દુખે", "muscle pain"),
    ("શ્વાસ ચડે", "shortness of breath"),
    ("દમ", "shortness of breath"),
    ("ઠંડી", "chills"),
    ("ધ્રુજારી", "chills"),
    ("ઉલટી", "vomiting"),
    ("ઓબકા", "nausea"),
    ("ઝાડા", "diarrhea"),
    ("જુલાબ", "diarrhea"),
    ("ખાંસી", "cough"),
    ("ઉધરસ", "cough"),
    ("શરદી", "cough"),
    ("ઝરઝરિયા", "nasal congestion"),
    ("અશક્તિ", "weakness"),
    ("થાક", "fatigue"),
    ("ચક્કર", "dizziness"),
    ("ખંજવાળ", "itching of skin"),
    ("સોજો", "skin swelling"),
    ("બળતરા", "burning"),
    ("કબજિયાત", "constipation"),
];

/// Reduce a locale code to its primary language subtag: `"hi-IN"` → `"hi"`.
/// Empty input means English.
pub fn language_key(code: &str) -> String {
    let primary = code
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if primary.is_empty() {
        "en".to_string()
    } else {
        primary
    }
}

#[derive(Debug, Clone, Default)]
struct LanguageTable {
    phrases: BTreeMap<String, SymptomId>,
    /// canonical → preferred local phrase
    reverse: HashMap<SymptomId, String>,
}

impl LanguageTable {
    /// Insert unless the phrase already exists. Returns whether it was added.
    fn insert_if_absent(&mut self, phrase: String, symptom: SymptomId) -> bool {
        if phrase.is_empty() || self.phrases.contains_key(&phrase) {
            return false;
        }
        self.phrases.insert(phrase, symptom);
        true
    }

    /// Shortest phrase per symptom, ties broken lexicographically.
    fn rebuild_reverse(&mut self, preferred: &BTreeMap<String, SymptomId>) {
        self.reverse.clear();
        for source in [preferred, &self.phrases] {
            let mut best: HashMap<&SymptomId, &String> = HashMap::new();
            for (phrase, symptom) in source {
                let entry = best.entry(symptom).or_insert(phrase);
                if phrase.chars().count() < entry.chars().count() {
                    *entry = phrase;
                }
            }
            for (symptom, phrase) in best {
                self.reverse
                    .entry(symptom.clone())
                    .or_insert_with(|| phrase.clone());
            }
        }
    }
}

/// One row of the English/Hindi/Gujarati symptom dictionary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionaryEntry<'a> {
    pub english: &'a str,
    pub hindi: Option<&'a str>,
    pub gujarati: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct TranslationMap {
    languages: HashMap<String, LanguageTable>,
}

impl TranslationMap {
    /// No phrases at all; only vocabulary terms will match.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in colloquial tables only.
    pub fn builtin() -> Self {
        Self::from_tables(HashMap::new())
    }

    /// Build from `{ language: { phrase: symptom } }`, then add the built-in tables
    /// underneath.
    pub fn from_tables(tables: HashMap<String, BTreeMap<String, String>>) -> Self {
        let mut languages: HashMap<String, LanguageTable> = HashMap::new();
        let mut loaded: HashMap<String, BTreeMap<String, SymptomId>> = HashMap::new();

        for (lang, phrases) in tables {
            let key = language_key(&lang);
            let table = languages.entry(key.clone()).or_default();
            let preferred = loaded.entry(key).or_default();
            for (phrase, symptom) in phrases {
                let phrase = normalize_term(&phrase);
                let symptom = SymptomId::new(&symptom);
                if table.insert_if_absent(phrase.clone(), symptom.clone()) {
                    preferred.insert(phrase, symptom);
                }
            }
        }

        for (lang, builtin) in [("hi", HINDI_COLLOQUIAL), ("gu", GUJARATI_COLLOQUIAL)] {
            let table = languages.entry(lang.to_string()).or_default();
            for (phrase, symptom) in builtin {
                table.insert_if_absent(normalize_term(phrase), SymptomId::new(symptom));
            }
        }

        for (lang, table) in languages.iter_mut() {
            let preferred = loaded.remove(lang).unwrap_or_default();
            table.rebuild_reverse(&preferred);
        }

        Self { languages }
    }

    /// Load `translations.json` and merge the built-in tables beneath it.
    pub fn load(path: &Path) -> Result<Self, TranslationError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::Load(path.display().to_string(), e.to_string()))?;
        let tables: HashMap<String, BTreeMap<String, String>> = serde_json::from_str(&raw)
            .map_err(|e| TranslationError::Parse(path.display().to_string(), e.to_string()))?;
        Ok(Self::from_tables(tables))
    }

    /// Phrases for a locale code, in lexicographic phrase order.
    pub fn phrases(&self, language: &str) -> Vec<(&str, &SymptomId)> {
        self.languages
            .get(&language_key(language))
            .map(|t| t.phrases.iter().map(|(p, s)| (p.as_str(), s)).collect())
            .unwrap_or_default()
    }

    pub fn phrase_count(&self, language: &str) -> usize {
        self.languages
            .get(&language_key(language))
            .map_or(0, |t| t.phrases.len())
    }

    /// Local wording for a canonical symptom, if the language has one.
    pub fn localize(&self, language: &str, symptom: &SymptomId) -> Option<&str> {
        self.languages
            .get(&language_key(language))
            .and_then(|t| t.reverse.get(symptom))
            .map(String::as_str)
    }

    /// Follow-up question for `symptom`, phrased in the session language.
    /// English and unknown languages always use the canonical name.
    pub fn question_for(&self, language: &str, symptom: &SymptomId) -> String {
        let name = self.localize(language, symptom).unwrap_or(symptom.as_str());
        match language_key(language).as_str() {
            "hi" => format!("क्या आपको {name} भी महसूस हो रहा है?"),
            "gu" => format!("શું તમને {name} પણ થાય છે?"),
            _ => format!("Do you also experience {symptom}?"),
        }
    }

    /// Vocabulary terms with a Hindi or Gujarati rendering, in vocabulary order.
    pub fn dictionary<'a>(&'a self, vocabulary: &'a Vocabulary) -> Vec<DictionaryEntry<'a>> {
        vocabulary
            .terms()
            .iter()
            .map(|symptom| DictionaryEntry {
                english: symptom.as_str(),
                hindi: self.localize("hi", symptom),
                gujarati: self.localize("gu", symptom),
            })
            .filter(|e| e.hindi.is_some() || e.gujarati.is_some())
            .collect()
    }
}
