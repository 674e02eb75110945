use std::collections::BTreeSet;
use std::sync::Arc;

use super::types::{
    Answer, DiagnosisEngine, InferenceNotice, Phase, QuestionView, SessionError, SessionSnapshot,
    SessionState, Verdict,
};
use crate::classifier::{select_candidates, DiseaseClassifier};
use crate::config::CONFIDENCE_SHORTCUT;
use crate::discriminator::{discriminate, ReferenceDataset};
use crate::vocabulary::{SymptomId, TranslationMap, Vocabulary};

/// Default engine: one classifier call per input cycle, then variance-driven questions.
pub struct DefaultDiagnosisEngine {
    vocabulary: Arc<Vocabulary>,
    translations: Arc<TranslationMap>,
    dataset: Arc<ReferenceDataset>,
    classifier: Arc<dyn DiseaseClassifier>,
}

impl DefaultDiagnosisEngine {
    /// Fails if the dataset was aligned to a different vocabulary.
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        translations: Arc<TranslationMap>,
        dataset: Arc<ReferenceDataset>,
        classifier: Arc<dyn DiseaseClassifier>,
    ) -> Result<Self, SessionError> {
        if !dataset.is_aligned_with(&vocabulary) {
            return Err(SessionError::DatasetMismatch);
        }
        Ok(Self {
            vocabulary,
            translations,
            dataset,
            classifier,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn finalize(&self, state: &mut SessionState, result: Verdict, notice: Option<InferenceNotice>) {
        state.phase = Phase::Final;
        state.question = None;
        state.result = Some(result);
        state.notice = notice;
        tracing::info!(
            session_id = %state.session_id,
            phase = %state.phase,
            result = state.result.as_ref().and_then(Verdict::label).unwrap_or("unknown"),
            asked = state.asked.len(),
            "Session finalized"
        );
    }

    /// Final on the top candidate; Refinement guarantees there is one.
    fn finalize_top(&self, state: &mut SessionState) {
        let verdict = state
            .candidates
            .first()
            .map_or(Verdict::Unknown, Verdict::from_candidate);
        let notice = match verdict {
            Verdict::Unknown => Some(InferenceNotice::NoCandidates),
            Verdict::Disease { .. } => None,
        };
        self.finalize(state, verdict, notice);
    }

    /// Ask the next discriminating question, or finish when none is left.
    fn advance(&self, state: &mut SessionState) -> Phase {
        let labels: Vec<String> = state.candidates.iter().map(|c| c.label.clone()).collect();
        match discriminate(&labels, &state.known, &state.asked, &self.dataset) {
            Some(symptom) => {
                tracing::info!(
                    session_id = %state.session_id,
                    phase = %state.phase,
                    question = %symptom,
                    "Follow-up question selected"
                );
                state.question = Some(symptom);
            }
            None => {
                tracing::info!(
                    session_id = %state.session_id,
                    "No discriminating symptom left"
                );
                self.finalize_top(state);
            }
        }
        state.phase
    }

    fn require_phase(
        state: &SessionState,
        expected: Phase,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if state.phase == expected {
            Ok(())
        } else {
            tracing::warn!(
                session_id = %state.session_id,
                phase = %state.phase,
                operation,
                "Operation rejected in current phase"
            );
            Err(SessionError::InvalidPhase {
                operation,
                phase: state.phase,
            })
        }
    }
}

impl DiagnosisEngine for DefaultDiagnosisEngine {
    fn start_session(&self) -> SessionState {
        let state = SessionState::new();
        tracing::info!(session_id = %state.session_id, "Diagnostic session started");
        state
    }

    fn classify(
        &self,
        state: &mut SessionState,
        symptoms: &BTreeSet<SymptomId>,
    ) -> Result<Phase, SessionError> {
        Self::require_phase(state, Phase::Input, "classify")?;

        if symptoms.is_empty() {
            tracing::warn!(session_id = %state.session_id, "Classify called with no symptoms");
            return Err(SessionError::EmptySymptoms);
        }

        let vector = self.vocabulary.encode(symptoms).inspect_err(|e| {
            tracing::warn!(session_id = %state.session_id, error = %e, "Invalid symptom set");
        })?;

        state.known = symptoms.clone();
        state.asked.clear();

        let start = std::time::Instant::now();
        let scores = match self.classifier.predict(&vector) {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!(
                    session_id = %state.session_id,
                    error = %e,
                    "Classifier unavailable, no retry"
                );
                self.finalize(
                    state,
                    Verdict::Unknown,
                    Some(InferenceNotice::ClassifierUnavailable(e.to_string())),
                );
                return Ok(state.phase);
            }
        };

        state.candidates = select_candidates(&scores);
        tracing::info!(
            session_id = %state.session_id,
            symptoms = vector.count_present(),
            labels = scores.len(),
            candidates = state.candidates.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Classification complete"
        );

        let Some(top) = state.candidates.first() else {
            self.finalize(state, Verdict::Unknown, Some(InferenceNotice::NoCandidates));
            return Ok(state.phase);
        };

        if top.probability > CONFIDENCE_SHORTCUT || state.candidates.len() == 1 {
            self.finalize_top(state);
            return Ok(state.phase);
        }

        state.phase = Phase::Refinement;
        Ok(self.advance(state))
    }

    fn answer(&self, state: &mut SessionState, answer: Answer) -> Result<Phase, SessionError> {
        Self::require_phase(state, Phase::Refinement, "answer")?;

        let Some(symptom) = state.question.take() else {
            self.finalize_top(state);
            return Ok(state.phase);
        };

        tracing::debug!(
            session_id = %state.session_id,
            symptom = %symptom,
            answer = ?answer,
            "Answer received"
        );

        match answer {
            Answer::Yes => {
                state.known.insert(symptom.clone());
                state.asked.insert(symptom);
            }
            Answer::No => {
                state.asked.insert(symptom);
            }
            Answer::Skip => {
                self.finalize_top(state);
                return Ok(state.phase);
            }
        }

        Ok(self.advance(state))
    }

    fn finish_now(&self, state: &mut SessionState) -> Result<Phase, SessionError> {
        Self::require_phase(state, Phase::Refinement, "finish")?;
        self.finalize_top(state);
        Ok(state.phase)
    }

    fn reset(&self, state: &mut SessionState) {
        state.clear();
        tracing::info!(session_id = %state.session_id, phase = %state.phase, "Session reset");
    }

    fn snapshot(&self, state: &SessionState, language: &str) -> SessionSnapshot {
        let question = state.question.as_ref().map(|symptom| QuestionView {
            symptom: symptom.clone(),
            text: self.translations.question_for(language, symptom),
        });

        SessionSnapshot {
            session_id: state.session_id,
            phase: state.phase,
            candidates: state.candidates.clone(),
            known: self.vocabulary.sorted(&state.known),
            question,
            result: state.result.clone(),
            notice: state.notice.clone(),
            published_at: chrono::Local::now().naive_local(),
        }
    }
}
