//! Disease knowledge shown with a final result: category, severity, emergency
//! flag, treatment mode, approximate cost and the specialist to consult.
//!
//! A built-in table covers common conditions; `disease_info.json` may extend or
//! override it. Unknown labels get a conservative default record.

pub mod explain;

pub use explain::*;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{strip_code_fence, LlmClient};
use crate::service::ServiceOutcome;
use crate::vocabulary::{language_key, normalize_term};

pub const GENERAL_PHYSICIAN: &str = "General Physician";

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Failed to read disease info {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse disease info {0}: {1}")]
    Parse(String, String),

    #[error("Malformed translated record: {0}")]
    MalformedTranslation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    #[serde(rename = "type")]
    pub category: String,
    pub severity: String,
    pub emergency: bool,
    pub treatment: String,
    pub cost: String,
    #[serde(default)]
    pub specialist: String,
}

impl Default for DiseaseInfo {
    fn default() -> Self {
        Self {
            category: "Unknown".into(),
            severity: "Unknown".into(),
            emergency: false,
            treatment: "Consult a doctor for proper diagnosis".into(),
            cost: "Varies".into(),
            specialist: GENERAL_PHYSICIAN.into(),
        }
    }
}

/// Disease → specialist, in match priority order for the partial pass.
const SPECIALISTS: &[(&str, &str)] = &[
    ("heart attack", "Cardiologist"),
    ("chest pain", "Cardiologist"),
    ("hypertension", "Cardiologist"),
    ("coronary artery disease", "Cardiologist"),
    ("fungal infection", "Dermatologist"),
    ("allergy", "Dermatologist"),
    ("drug reaction", "Dermatologist"),
    ("acne", "Dermatologist"),
    ("psoriasis", "Dermatologist"),
    ("impetigo", "Dermatologist"),
    ("chicken pox", GENERAL_PHYSICIAN),
    ("skin infection", "Dermatologist"),
    ("diabetes", "Diabetologist"),
    ("hypoglycemia", "Diabetologist"),
    ("hypothyroidism", "Endocrinologist"),
    ("hyperthyroidism", "Endocrinologist"),
    ("gerd", "Gastroenterologist"),
    ("chronic cholestasis", "Gastroenterologist"),
    ("peptic ulcer diseae", "Gastroenterologist"),
    ("jaundice", "Gastroenterologist"),
    ("alcoholic hepatitis", "Gastroenterologist"),
    ("hepatitis", "Gastroenterologist"),
    ("migraine", "Neurologist"),
    ("paralysis (brain hemorrhage)", "Neurologist"),
    ("cervical spondylosis", "Neurologist"),
    ("osteoarthristis", "Orthopedist"),
    ("arthritis", "Orthopedist"),
    ("bronchial asthma", "Pulmonologist"),
    ("pneumonia", "Pulmonologist"),
    ("tuberculosis", "Pulmonologist"),
    ("malaria", GENERAL_PHYSICIAN),
    ("dengue", GENERAL_PHYSICIAN),
    ("typhoid", GENERAL_PHYSICIAN),
    ("common cold", GENERAL_PHYSICIAN),
    ("fever", GENERAL_PHYSICIAN),
    ("hyperemesis gravidarum", "Obstetrician"),
    ("pcos", "Gynecologist"),
];

/// (disease, type, severity, emergency, treatment, cost)
const BUILTIN_INFO: &[(&str, &str, &str, bool, &str, &str)] = &[
    ("malaria", "Infectious", "High", true, "Hospitalization may be required", "₹5,000 - ₹20,000"),
    ("dengue", "Viral", "High", true, "Hospital monitoring of platelets", "₹10,000 - ₹50,000"),
    ("typhoid", "Bacterial", "Medium", false, "Antibiotics, home care", "₹2,000 - ₹10,000"),
    ("common cold", "Viral", "Low", false, "Rest and fluids, home care", "₹200 - ₹1,000"),
    ("pneumonia", "Infectious", "High", true, "Hospitalization, antibiotics", "₹15,000 - ₹60,000"),
    ("tuberculosis", "Bacterial", "High", false, "Long-course antibiotics (DOTS)", "Free under government programme"),
    ("bronchial asthma", "Chronic", "Medium", false, "Inhalers, regular follow-up", "₹1,000 - ₹5,000 per month"),
    ("migraine", "Neurological", "Medium", false, "Medication, lifestyle changes", "₹500 - ₹3,000"),
    ("hypertension", "Chronic", "Medium", false, "Daily medication, diet control", "₹500 - ₹2,000 per month"),
    ("heart attack", "Cardiac", "Critical", true, "Emergency hospitalization", "₹1,00,000 - ₹5,00,000"),
    ("diabetes", "Chronic", "Medium", false, "Medication, diet and exercise", "₹1,000 - ₹5,000 per month"),
    ("jaundice", "Hepatic", "Medium", false, "Rest, diet, treat underlying cause", "₹2,000 - ₹15,000"),
    ("gerd", "Digestive", "Low", false, "Antacids, diet changes", "₹300 - ₹2,000"),
    ("gastroenteritis", "Digestive", "Medium", false, "Oral rehydration, home care", "₹500 - ₹3,000"),
    ("chicken pox", "Viral", "Medium", false, "Antivirals, isolation, home care", "₹1,000 - ₹5,000"),
    ("fungal infection", "Skin", "Low", false, "Antifungal creams", "₹300 - ₹2,000"),
    ("allergy", "Immune", "Low", false, "Antihistamines, avoid triggers", "₹200 - ₹1,500"),
    ("urinary tract infection", "Bacterial", "Medium", false, "Antibiotics", "₹500 - ₹3,000"),
];

/// Raw record in `disease_info.json`; missing fields keep the default values.
#[derive(Debug, Deserialize)]
struct InfoOverride {
    #[serde(rename = "type")]
    category: Option<String>,
    severity: Option<String>,
    emergency: Option<bool>,
    treatment: Option<String>,
    cost: Option<String>,
    specialist: Option<String>,
}

pub struct KnowledgeBase {
    entries: HashMap<String, DiseaseInfo>,
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        let entries = BUILTIN_INFO
            .iter()
            .map(|(name, category, severity, emergency, treatment, cost)| {
                let info = DiseaseInfo {
                    category: category.to_string(),
                    severity: severity.to_string(),
                    emergency: *emergency,
                    treatment: treatment.to_string(),
                    cost: cost.to_string(),
                    specialist: recommend_specialist(name).to_string(),
                };
                (normalize_term(name), info)
            })
            .collect();
        Self { entries }
    }

    /// Built-in table overlaid with `disease_info.json` (`{ label: record }`).
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| KnowledgeError::Load(path.display().to_string(), e.to_string()))?;
        let overrides: HashMap<String, InfoOverride> = serde_json::from_str(&raw)
            .map_err(|e| KnowledgeError::Parse(path.display().to_string(), e.to_string()))?;

        let mut base = Self::builtin();
        let count = overrides.len();
        for (name, patch) in overrides {
            let key = normalize_term(&name);
            let mut info = base.entries.remove(&key).unwrap_or_else(|| DiseaseInfo {
                specialist: recommend_specialist(&key).to_string(),
                ..DiseaseInfo::default()
            });
            if let Some(v) = patch.category {
                info.category = v;
            }
            if let Some(v) = patch.severity {
                info.severity = v;
            }
            if let Some(v) = patch.emergency {
                info.emergency = v;
            }
            if let Some(v) = patch.treatment {
                info.treatment = v;
            }
            if let Some(v) = patch.cost {
                info.cost = v;
            }
            if let Some(v) = patch.specialist {
                info.specialist = v;
            }
            base.entries.insert(key, info);
        }

        tracing::info!(path = %path.display(), overrides = count, "Disease info loaded");
        Ok(base)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case- and whitespace-insensitive lookup; unknown labels get the default record
    /// with a specialist derived from the label.
    pub fn lookup(&self, disease: &str) -> DiseaseInfo {
        let key = normalize_term(disease);
        match self.entries.get(&key) {
            Some(info) => info.clone(),
            None => DiseaseInfo {
                specialist: recommend_specialist(&key).to_string(),
                ..DiseaseInfo::default()
            },
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Direct match, then the first table key contained in the label, then General Physician.
pub fn recommend_specialist(disease: &str) -> &'static str {
    let key = normalize_term(disease);
    if key.is_empty() {
        return GENERAL_PHYSICIAN;
    }
    SPECIALISTS
        .iter()
        .find(|(name, _)| *name == key)
        .or_else(|| SPECIALISTS.iter().find(|(name, _)| key.contains(name)))
        .map_or(GENERAL_PHYSICIAN, |(_, specialist)| *specialist)
}

/// Display name of a language for prompts.
pub fn language_name(code: &str) -> String {
    match language_key(code).as_str() {
        "en" => "English".into(),
        "hi" => "Hindi".into(),
        "gu" => "Gujarati".into(),
        "mr" => "Marathi".into(),
        "ta" => "Tamil".into(),
        "te" => "Telugu".into(),
        "bn" => "Bengali".into(),
        other => other.to_string(),
    }
}

fn build_localize_prompt(info: &DiseaseInfo, language: &str) -> Result<String, KnowledgeError> {
    let data = serde_json::to_string(info)
        .map_err(|e| KnowledgeError::MalformedTranslation(e.to_string()))?;
    Ok(format!(
        "Translate the following medical information into simple {language}. \
Maintain the JSON structure. Translate the values, not the keys.\n\
Target Language: {language}\n\
Data: {data}"
    ))
}

/// Parse a translated record. The emergency flag is never taken from the model.
fn parse_localized(response: &str, original: &DiseaseInfo) -> Result<DiseaseInfo, KnowledgeError> {
    let body = strip_code_fence(response);
    let body = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(KnowledgeError::MalformedTranslation(
                "No JSON object found in response".into(),
            ))
        }
    };
    let mut translated: DiseaseInfo = serde_json::from_str(body)
        .map_err(|e| KnowledgeError::MalformedTranslation(e.to_string()))?;
    translated.emergency = original.emergency;
    if translated.specialist.trim().is_empty() {
        translated.specialist = original.specialist.clone();
    }
    Ok(translated)
}

/// Translate the record's values into `language`. English is returned as-is;
/// any failure degrades to the untranslated record.
pub fn localize_info(
    client: &dyn LlmClient,
    model: &str,
    info: &DiseaseInfo,
    language: &str,
) -> ServiceOutcome<DiseaseInfo> {
    if language_key(language) == "en" {
        return ServiceOutcome::Ok(info.clone());
    }

    let name = language_name(language);
    let result = build_localize_prompt(info, &name).and_then(|prompt| {
        client
            .generate(model, &prompt, "You are a medical translator. Reply with JSON only.")
            .map_err(|e| KnowledgeError::MalformedTranslation(e.to_string()))
            .and_then(|response| parse_localized(&response, info))
    });

    match result {
        Ok(translated) => {
            tracing::debug!(language = %name, "Disease info localized");
            ServiceOutcome::Ok(translated)
        }
        Err(e) => {
            tracing::warn!(language = %name, error = %e, "Localization failed, showing English");
            ServiceOutcome::degraded(info.clone(), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};

    #[test]
    fn specialist_direct_match() {
        assert_eq!(recommend_specialist("Migraine"), "Neurologist");
        assert_eq!(recommend_specialist("  GERD "), "Gastroenterologist");
    }

    #[test]
    fn specialist_partial_match() {
        assert_eq!(recommend_specialist("Hepatitis B"), "Gastroenterologist");
        assert_eq!(recommend_specialist("Dimorphic hemmorhoids(piles)"), GENERAL_PHYSICIAN);
        assert_eq!(recommend_specialist("Chronic bronchial asthma"), "Pulmonologist");
    }

    #[test]
    fn specialist_fallback() {
        assert_eq!(recommend_specialist("Vertigo"), GENERAL_PHYSICIAN);
        assert_eq!(recommend_specialist(""), GENERAL_PHYSICIAN);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let kb = KnowledgeBase::builtin();
        let info = kb.lookup("  MALARIA ");
        assert!(info.emergency);
        assert_eq!(info.specialist, GENERAL_PHYSICIAN);
        assert_eq!(kb.lookup("Migraine").specialist, "Neurologist");
    }

    #[test]
    fn lookup_unknown_gets_default() {
        let info = KnowledgeBase::builtin().lookup("Psoriasis");
        assert_eq!(info.category, "Unknown");
        assert_eq!(info.specialist, "Dermatologist");
    }

    #[test]
    fn load_overlays_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disease_info.json");
        std::fs::write(
            &path,
            r#"{
                "Malaria": {"cost": "₹1,000"},
                "Vertigo": {"type": "Neurological", "severity": "Low", "specialist": "ENT Specialist"}
            }"#,
        )
        .unwrap();

        let kb = KnowledgeBase::load(&path).unwrap();
        let malaria = kb.lookup("malaria");
        assert_eq!(malaria.cost, "₹1,000");
        assert_eq!(malaria.severity, "High");

        let vertigo = kb.lookup("vertigo");
        assert_eq!(vertigo.category, "Neurological");
        assert_eq!(vertigo.specialist, "ENT Specialist");
        assert_eq!(kb.len(), KnowledgeBase::builtin().len() + 1);
    }

    #[test]
    fn load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disease_info.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(KnowledgeBase::load(&path), Err(KnowledgeError::Parse(..))));
    }

    #[test]
    fn english_is_not_sent_to_model() {
        let client = MockLlmClient::new("{}");
        let info = KnowledgeBase::builtin().lookup("typhoid");
        let outcome = localize_info(&client, "medgemma", &info, "en-IN");
        assert_eq!(outcome, ServiceOutcome::Ok(info));
        assert!(client.prompts().is_empty());
    }

    #[test]
    fn localized_record_keeps_emergency_flag() {
        let response = r#"```json
{"type": "संक्रामक", "severity": "उच्च", "emergency": false,
 "treatment": "अस्पताल में भर्ती", "cost": "₹5,000 - ₹20,000", "specialist": "सामान्य चिकित्सक"}
```"#;
        let client = MockLlmClient::new(response);
        let info = KnowledgeBase::builtin().lookup("malaria");

        let outcome = localize_info(&client, "medgemma", &info, "hi-IN");
        let translated = outcome.value().unwrap();
        assert!(outcome.is_ok());
        assert_eq!(translated.severity, "उच्च");
        assert!(translated.emergency);
        assert!(client.prompts()[0].contains("simple Hindi"));
    }

    #[test]
    fn localization_failure_degrades_to_original() {
        let info = KnowledgeBase::builtin().lookup("dengue");

        let offline = MockLlmClient::failing(LlmError::Connection("http://localhost:11434".into()));
        let outcome = localize_info(&offline, "medgemma", &info, "gu");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.value(), Some(&info));

        let garbage = MockLlmClient::new("Sorry, I cannot translate that.");
        let outcome = localize_info(&garbage, "medgemma", &info, "gu");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_value(), Some(info));
    }

    #[test]
    fn language_names() {
        assert_eq!(language_name("gu-IN"), "Gujarati");
        assert_eq!(language_name("fr"), "fr");
    }
}
