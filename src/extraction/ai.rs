//! AI-assisted symptom matcher.
//!
//! The model sees the patient's words plus the full vocabulary and must answer
//! with a JSON array of vocabulary names. Its answer is untrusted: anything that
//! is not a vocabulary member is dropped, and any failure degrades to an empty set.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::ExtractionError;
use crate::llm::{strip_code_fence, LlmClient};
use crate::service::ServiceOutcome;
use crate::vocabulary::{SymptomId, Vocabulary};

/// Best-effort extractor behind the local matcher.
pub trait AiSymptomMatcher: Send + Sync {
    fn extract(&self, text: &str, vocabulary: &Vocabulary) -> ServiceOutcome<BTreeSet<SymptomId>>;
}

/// AI matcher backed by an [`LlmClient`].
pub struct LlmSymptomMatcher {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmSymptomMatcher {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

impl AiSymptomMatcher for LlmSymptomMatcher {
    fn extract(&self, text: &str, vocabulary: &Vocabulary) -> ServiceOutcome<BTreeSet<SymptomId>> {
        let system = build_system_prompt(vocabulary);
        let prompt = build_user_prompt(text);

        let result = self
            .client
            .generate(&self.model, &prompt, &system)
            .map_err(ExtractionError::from)
            .and_then(|response| parse_ai_symptoms(&response, vocabulary));

        match result {
            Ok(symptoms) => {
                tracing::debug!(count = symptoms.len(), "AI symptom extraction complete");
                ServiceOutcome::Ok(symptoms)
            }
            Err(e) => {
                tracing::warn!(error = %e, "AI symptom extraction failed, using local match only");
                ServiceOutcome::degraded(BTreeSet::new(), e.to_string())
            }
        }
    }
}

/// System prompt restricting the model to the enumerated vocabulary.
pub fn build_system_prompt(vocabulary: &Vocabulary) -> String {
    let names: Vec<&str> = vocabulary.terms().iter().map(|s| s.as_str()).collect();
    format!(
        "You are a medical symptom detector. The patient may speak in English, Hindi, \
or Gujarati.\n\n\
Your task:\n\
1. Understand the patient's input text, translating it to English if needed.\n\
2. Extract ONLY the symptoms mentioned.\n\
3. Match them EXACTLY to symptom names from this official list: {list}\n\
4. Return a valid JSON array of matched symptom names.\n\n\
Example input: \"मुझे सिर दर्द और बुखार है\"\n\
Example output: [\"headache\", \"fever\"]\n\n\
RULES:\n\
- Return ONLY the JSON array, no explanations.\n\
- Do NOT invent symptoms.\n\
- If no symptoms match, return [].",
        list = names.join(", ")
    )
}

pub fn build_user_prompt(text: &str) -> String {
    format!("Patient input: \"{}\"\n\nExtracted symptoms (JSON array):", text.trim())
}

/// Strip code fences, parse a JSON array, and keep only vocabulary members.
pub fn parse_ai_symptoms(
    response: &str,
    vocabulary: &Vocabulary,
) -> Result<BTreeSet<SymptomId>, ExtractionError> {
    let body = strip_code_fence(response);

    let array = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(ExtractionError::MalformedResponse(
                "No JSON array found in response".to_string(),
            ))
        }
    };

    let values: Vec<serde_json::Value> = serde_json::from_str(array)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

    let total = values.len();
    let symptoms: BTreeSet<SymptomId> = values
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| vocabulary.resolve(s))
        .collect();

    if symptoms.len() < total {
        tracing::debug!(
            returned = total,
            kept = symptoms.len(),
            "Dropped AI symptoms outside vocabulary"
        );
    }

    Ok(symptoms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};

    fn vocab() -> Vocabulary {
        Vocabulary::new(["fever", "cough", "headache", "vomiting"]).unwrap()
    }

    fn names(set: &BTreeSet<SymptomId>) -> Vec<&str> {
        set.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn parse_plain_array() {
        let found = parse_ai_symptoms(r#"["fever", "headache"]"#, &vocab()).unwrap();
        assert_eq!(names(&found), vec!["fever", "headache"]);
    }

    #[test]
    fn parse_fenced_array() {
        let response = "```json\n[\"Cough\", \"vomiting\"]\n```";
        let found = parse_ai_symptoms(response, &vocab()).unwrap();
        assert_eq!(names(&found), vec!["cough", "vomiting"]);
    }

    #[test]
    fn parse_python_fence_and_chatter() {
        let response = "Sure! Here you go:\n```python\n['fever']\n```";
        // Single quotes are not JSON; the response is rejected rather than guessed at.
        assert!(parse_ai_symptoms(response, &vocab()).is_err());
    }

    #[test]
    fn parse_drops_values_outside_vocabulary() {
        let found =
            parse_ai_symptoms(r#"["fever", "dragon pox", 42, null, "headache"]"#, &vocab()).unwrap();
        assert_eq!(names(&found), vec!["fever", "headache"]);
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_ai_symptoms("[]", &vocab()).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_non_array() {
        assert!(matches!(
            parse_ai_symptoms(r#"{"symptoms": "fever"}"#, &vocab()).unwrap_err(),
            ExtractionError::MalformedResponse(_)
        ));
        assert!(parse_ai_symptoms("I could not find anything", &vocab()).is_err());
    }

    #[test]
    fn system_prompt_enumerates_vocabulary() {
        let prompt = build_system_prompt(&vocab());
        assert!(prompt.contains("fever, cough, headache, vomiting"));
        assert!(prompt.contains("Do NOT invent symptoms"));
    }

    #[test]
    fn matcher_ok_on_valid_response() {
        let client = Arc::new(MockLlmClient::new(r#"["cough"]"#));
        let matcher = LlmSymptomMatcher::new(client.clone(), "medgemma");
        let outcome = matcher.extract("khansi hai", &vocab());
        assert!(outcome.is_ok());
        assert_eq!(names(outcome.value().unwrap()), vec!["cough"]);
        assert!(client.prompts()[0].contains("khansi hai"));
    }

    #[test]
    fn matcher_degrades_on_service_error() {
        let client = Arc::new(MockLlmClient::failing(LlmError::Connection(
            "http://localhost:11434".into(),
        )));
        let outcome = LlmSymptomMatcher::new(client, "medgemma").extract("fever", &vocab());
        assert!(outcome.is_degraded());
        assert!(outcome.value().unwrap().is_empty());
        assert!(outcome.reason().unwrap().contains("not running"));
    }

    #[test]
    fn matcher_degrades_on_garbage() {
        let client = Arc::new(MockLlmClient::new("I am not sure what you mean."));
        let outcome = LlmSymptomMatcher::new(client, "medgemma").extract("fever", &vocab());
        assert!(outcome.is_degraded());
        assert!(outcome.value().unwrap().is_empty());
    }
}
