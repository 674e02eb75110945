use std::collections::BTreeSet;
use std::sync::Arc;

use super::ai::AiSymptomMatcher;
use super::local::match_local;
use super::selection::SymptomSelection;
use super::speech::{self, SpeechRecognizer};
use super::types::{ExtractionOutcome, ExtractionReport, ExtractionSource};
use crate::service::ServiceOutcome;
use crate::vocabulary::{SymptomId, TranslationMap, Vocabulary};

/// Runs the local matcher, then the AI matcher if one is configured, and merges.
pub struct SymptomExtractor {
    vocabulary: Arc<Vocabulary>,
    translations: Arc<TranslationMap>,
    ai: Option<Arc<dyn AiSymptomMatcher>>,
}

impl SymptomExtractor {
    pub fn new(vocabulary: Arc<Vocabulary>, translations: Arc<TranslationMap>) -> Self {
        Self {
            vocabulary,
            translations,
            ai: None,
        }
    }

    pub fn with_ai(mut self, matcher: Arc<dyn AiSymptomMatcher>) -> Self {
        self.ai = Some(matcher);
        self
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    pub fn translations(&self) -> &TranslationMap {
        &self.translations
    }

    /// Extract canonical symptoms from free text. Never touches any selection.
    pub fn extract(&self, text: &str, language: &str) -> ExtractionOutcome {
        if text.trim().is_empty() {
            return ExtractionOutcome::NothingMatched {
                fallback_used: false,
            };
        }

        let local = match_local(text, language, &self.vocabulary, &self.translations);

        let (ai, fallback_used) = match &self.ai {
            Some(matcher) => match matcher.extract(text, &self.vocabulary) {
                ServiceOutcome::Ok(found) => (found, false),
                ServiceOutcome::Degraded { value, .. } => (value, true),
                ServiceOutcome::Failed { .. } => (BTreeSet::new(), true),
            },
            None => (BTreeSet::new(), false),
        };

        // Whitelist again at the merge boundary; the matcher is a trait object.
        let ai: BTreeSet<SymptomId> = ai
            .into_iter()
            .filter(|s| self.vocabulary.contains(s))
            .collect();

        let symptoms: BTreeSet<SymptomId> = local.union(&ai).cloned().collect();

        tracing::info!(
            language,
            local = local.len(),
            ai = ai.len(),
            merged = symptoms.len(),
            fallback_used,
            "Symptom extraction complete"
        );

        if symptoms.is_empty() {
            return ExtractionOutcome::NothingMatched { fallback_used };
        }

        let source = match (local.is_empty(), ai.is_empty()) {
            (false, false) => ExtractionSource::Both,
            (true, false) => ExtractionSource::Ai,
            _ => ExtractionSource::Local,
        };

        ExtractionOutcome::Matched(ExtractionReport {
            symptoms,
            local,
            ai,
            source,
            fallback_used,
        })
    }

    /// Extract from text and stage the result into `selection`.
    /// Nothing is staged when nothing matched.
    pub fn ingest_text(
        &self,
        text: &str,
        language: &str,
        selection: &mut SymptomSelection,
    ) -> ExtractionOutcome {
        let outcome = self.extract(text, language);
        if let Some(symptoms) = outcome.symptoms() {
            selection.stage(symptoms);
        }
        outcome
    }

    /// Transcribe audio, then behave like [`ingest_text`](Self::ingest_text).
    /// A failed transcription leaves the selection untouched.
    pub fn ingest_speech(
        &self,
        recognizer: &dyn SpeechRecognizer,
        audio: &[u8],
        language: &str,
        selection: &mut SymptomSelection,
    ) -> ServiceOutcome<ExtractionOutcome> {
        match speech::transcribe(recognizer, audio, language) {
            ServiceOutcome::Ok(text) => ServiceOutcome::Ok(self.ingest_text(&text, language, selection)),
            ServiceOutcome::Degraded { value, reason } => {
                ServiceOutcome::degraded(self.ingest_text(&value, language, selection), reason)
            }
            ServiceOutcome::Failed { reason } => ServiceOutcome::Failed { reason },
        }
    }
}
