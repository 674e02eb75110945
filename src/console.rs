//! Line-oriented console front-end.
//!
//! A thin consumer of the public API: free text is run through the extraction
//! front-end and staged, `confirm` commits it, `go` classifies, and follow-up
//! questions are answered with yes/no/skip. A final diagnosis is followed by
//! its disease record and a plain-language explanation.

use std::io::{BufRead, Write};
use std::sync::Arc;

use thiserror::Error;

use crate::classifier::{ClassifierError, HttpClassifier};
use crate::config::TriageConfig;
use crate::extraction::{ExtractionOutcome, LlmSymptomMatcher, SymptomExtractor, SymptomSelection};
use crate::knowledge::{explain_disease, localize_info, offline_explanation, KnowledgeBase};
use crate::llm::{LlmClient, LlmError, OllamaClient};
use crate::resources::{ResourceError, Resources};
use crate::service::ServiceOutcome;
use crate::session::{
    Answer, DefaultDiagnosisEngine, DiagnosisEngine, Phase, SessionError, SessionSnapshot,
    SessionState, Verdict,
};
use crate::vocabulary::SymptomId;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Resource error: {0}")]
    Resources(#[from] ResourceError),

    #[error("Classifier setup failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("LLM setup failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Session setup failed: {0}")]
    Session(#[from] SessionError),

    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const HELP: &str = "Describe your symptoms in English, Hindi or Gujarati, or use:\n  \
    list | dictionary | add <symptom> | remove <symptom> | confirm | discard | go\n  \
    lang <code> | reset | quit";

pub struct ConsoleApp {
    engine: DefaultDiagnosisEngine,
    extractor: SymptomExtractor,
    knowledge: Arc<KnowledgeBase>,
    llm: Option<(Arc<dyn LlmClient>, String)>,
    language: String,
}

impl ConsoleApp {
    pub fn new(
        engine: DefaultDiagnosisEngine,
        extractor: SymptomExtractor,
        knowledge: Arc<KnowledgeBase>,
        language: &str,
    ) -> Self {
        Self {
            engine,
            extractor,
            knowledge,
            llm: None,
            language: language.to_string(),
        }
    }

    /// Use this client to translate disease info and write explanations.
    pub fn with_llm(mut self, client: Arc<dyn LlmClient>, model: &str) -> Self {
        self.llm = Some((client, model.to_string()));
        self
    }

    /// Enable AI extraction, localization and explanations when `model` is
    /// installed. Otherwise the app stays on the local matcher and offline text.
    pub fn with_ai(mut self, client: Arc<dyn LlmClient>, model: &str) -> Self {
        match client.is_model_available(model) {
            Ok(true) => {
                tracing::info!(model, "AI extraction enabled");
                self.extractor = self
                    .extractor
                    .with_ai(Arc::new(LlmSymptomMatcher::new(client.clone(), model)));
                self.with_llm(client, model)
            }
            Ok(false) => {
                tracing::warn!(model, "Model not installed, AI extraction disabled");
                self
            }
            Err(e) => {
                tracing::warn!(model, error = %e, "LLM service unavailable, AI extraction disabled");
                self
            }
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.extractor.has_ai()
    }

    /// Wire the HTTP classifier and, when enabled, the Ollama-backed AI matcher.
    pub fn from_config(config: &TriageConfig) -> Result<Self, ConsoleError> {
        let resources = Resources::load(&config.resources_dir)?;

        let classifier = HttpClassifier::new(&config.classifier_url, config.timeout())?
            .with_input_len(resources.vocabulary.len())
            .with_label_whitelist(resources.dataset.diseases());

        let engine = DefaultDiagnosisEngine::new(
            resources.vocabulary.clone(),
            resources.translations.clone(),
            resources.dataset.clone(),
            Arc::new(classifier),
        )?;

        let extractor =
            SymptomExtractor::new(resources.vocabulary.clone(), resources.translations.clone());
        let app = Self::new(engine, extractor, resources.knowledge.clone(), &config.language);

        if !config.ai_enabled {
            tracing::info!("AI extraction disabled, local matcher only");
            return Ok(app);
        }
        let client = OllamaClient::new(&config.ollama_url, config.timeout())?;
        Ok(app.with_ai(Arc::new(client), &config.model))
    }

    /// Run until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<(), ConsoleError> {
        let mut state = self.engine.start_session();
        let mut selection = SymptomSelection::new();

        writeln!(out, "{HELP}")?;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "quit" | "exit") {
                break;
            }
            if line == "reset" {
                self.engine.reset(&mut state);
                selection.clear();
                writeln!(out, "Session reset.")?;
                continue;
            }

            match state.phase() {
                Phase::Input => self.handle_input(line, &mut state, &mut selection, out)?,
                Phase::Refinement => self.handle_answer(line, &mut state, out)?,
                Phase::Final => writeln!(out, "Type 'reset' to start over or 'quit' to exit.")?,
            }
        }
        Ok(())
    }

    fn handle_input<W: Write>(
        &mut self,
        line: &str,
        state: &mut SessionState,
        selection: &mut SymptomSelection,
        out: &mut W,
    ) -> Result<(), ConsoleError> {
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        match command {
            "help" => writeln!(out, "{HELP}")?,
            "list" => {
                let names: Vec<&str> = self
                    .engine
                    .vocabulary()
                    .terms()
                    .iter()
                    .map(SymptomId::as_str)
                    .collect();
                writeln!(out, "Known symptoms: {}", names.join(", "))?;
            }
            "dictionary" => {
                let rows = self.extractor.translations().dictionary(self.engine.vocabulary());
                writeln!(out, "English | Hindi | Gujarati")?;
                for row in rows {
                    writeln!(
                        out,
                        "{} | {} | {}",
                        row.english,
                        row.hindi.unwrap_or("-"),
                        row.gujarati.unwrap_or("-")
                    )?;
                }
            }
            "lang" if !arg.is_empty() => {
                self.language = arg.to_string();
                writeln!(out, "Language set to {arg}.")?;
            }
            "add" => match self.engine.vocabulary().resolve(arg) {
                Some(symptom) => {
                    selection.select(symptom);
                    write_selection(selection, out)?;
                }
                None => writeln!(out, "'{arg}' is not a known symptom. Type 'list' to see them.")?,
            },
            "remove" => {
                selection.deselect(&SymptomId::new(arg));
                write_selection(selection, out)?;
            }
            "confirm" => {
                if selection.commit() {
                    write_selection(selection, out)?;
                } else {
                    writeln!(out, "Nothing to confirm.")?;
                }
            }
            "discard" => {
                selection.discard();
                write_selection(selection, out)?;
            }
            "go" => {
                selection.commit();
                match self.engine.classify(state, selection.live()) {
                    Ok(_) => self.write_snapshot(state, out)?,
                    Err(SessionError::EmptySymptoms) => {
                        writeln!(out, "Please select or describe at least one symptom first.")?
                    }
                    Err(e) => writeln!(out, "{e}")?,
                }
            }
            _ => {
                let outcome = self.extractor.ingest_text(line, &self.language, selection);
                writeln!(out, "{}", outcome.message())?;
                if let ExtractionOutcome::Matched(_) = outcome {
                    if let Some(pending) = selection.pending() {
                        let names: Vec<&str> = pending.iter().map(SymptomId::as_str).collect();
                        writeln!(
                            out,
                            "Selection will be: {}. Type 'confirm' or 'discard'.",
                            names.join(", ")
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_answer<W: Write>(
        &self,
        line: &str,
        state: &mut SessionState,
        out: &mut W,
    ) -> Result<(), ConsoleError> {
        let result = if line == "finish" {
            self.engine.finish_now(state)
        } else {
            match Answer::parse(line) {
                Some(answer) => self.engine.answer(state, answer),
                None => {
                    writeln!(out, "Please answer yes, no or skip.")?;
                    return Ok(());
                }
            }
        };

        match result {
            Ok(_) => self.write_snapshot(state, out)?,
            Err(e) => writeln!(out, "{e}")?,
        }
        Ok(())
    }

    fn write_snapshot<W: Write>(&self, state: &SessionState, out: &mut W) -> Result<(), ConsoleError> {
        let snapshot = self.engine.snapshot(state, &self.language);
        match snapshot.phase {
            Phase::Refinement => {
                write_candidates(&snapshot, out)?;
                if let Some(question) = &snapshot.question {
                    writeln!(out, "{} (yes/no/skip)", question.text)?;
                }
            }
            Phase::Final => self.write_result(&snapshot, out)?,
            Phase::Input => {}
        }
        Ok(())
    }

    fn write_result<W: Write>(&self, snapshot: &SessionSnapshot, out: &mut W) -> Result<(), ConsoleError> {
        match &snapshot.result {
            Some(Verdict::Disease { label, probability }) => {
                writeln!(out, "Diagnosis: {label} ({:.0}% confidence)", probability * 100.0)?;

                let info = self.knowledge.lookup(label);
                let info = match &self.llm {
                    Some((client, model)) => {
                        match localize_info(client.as_ref(), model, &info, &self.language) {
                            ServiceOutcome::Ok(localized) => localized,
                            ServiceOutcome::Degraded { value, .. } => value,
                            ServiceOutcome::Failed { .. } => info,
                        }
                    }
                    None => info,
                };

                writeln!(out, "  Type: {}  Severity: {}", info.category, info.severity)?;
                writeln!(out, "  Emergency: {}", if info.emergency { "YES" } else { "No" })?;
                writeln!(out, "  Treatment: {}", info.treatment)?;
                writeln!(out, "  Approx cost: {}", info.cost)?;
                writeln!(out, "  Specialist to consult: {}", info.specialist)?;

                let explanation = match &self.llm {
                    Some((client, model)) => {
                        explain_disease(client.as_ref(), model, label, &self.language)
                            .into_value()
                            .unwrap_or_else(|| offline_explanation(label, &self.language))
                    }
                    None => offline_explanation(label, &self.language),
                };
                writeln!(out, "{explanation}")?;
                writeln!(
                    out,
                    "This is not a medical diagnosis. Please consult a qualified doctor."
                )?;
            }
            Some(Verdict::Unknown) | None => {
                let message = snapshot
                    .notice
                    .as_ref()
                    .map(|n| n.message())
                    .unwrap_or_else(|| "No result.".to_string());
                writeln!(out, "{message}")?;
            }
        }
        writeln!(out, "Type 'reset' to start over or 'quit' to exit.")?;
        Ok(())
    }
}

fn write_selection<W: Write>(selection: &SymptomSelection, out: &mut W) -> std::io::Result<()> {
    let names: Vec<&str> = selection.live().iter().map(SymptomId::as_str).collect();
    if names.is_empty() {
        writeln!(out, "Selected: (none)")
    } else {
        writeln!(out, "Selected: {}", names.join(", "))
    }
}

fn write_candidates<W: Write>(snapshot: &SessionSnapshot, out: &mut W) -> std::io::Result<()> {
    let parts: Vec<String> = snapshot
        .candidates
        .iter()
        .map(|c| format!("{} {:.0}%", c.label, c.probability * 100.0))
        .collect();
    writeln!(out, "Possible conditions: {}", parts.join(", "))
}

/// Load configuration and run an interactive session on stdin/stdout.
pub fn launch() -> Result<(), Box<dyn std::error::Error>> {
    let config = TriageConfig::from_env()?;
    tracing::info!(
        resources = %config.resources_dir.display(),
        classifier = %config.classifier_url,
        ai_enabled = config.ai_enabled,
        language = %config.language,
        "Configuration loaded"
    );

    let mut app = ConsoleApp::from_config(&config)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    app.run(stdin.lock(), &mut stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MockClassifier;
    use crate::discriminator::ReferenceDataset;
    use crate::llm::MockLlmClient;
    use crate::vocabulary::{TranslationMap, Vocabulary};

    fn app(classifier: MockClassifier) -> ConsoleApp {
        let vocabulary = Arc::new(Vocabulary::new(["fever", "cough", "headache", "nausea"]).unwrap());
        let translations = Arc::new(TranslationMap::builtin());
        let dataset = Arc::new(
            ReferenceDataset::from_csv_str(
                "diseases,fever,cough,headache,nausea\nMalaria,1,0,1,1\nTyphoid,1,0,1,0\n",
                &vocabulary,
            )
            .unwrap(),
        );
        let engine = DefaultDiagnosisEngine::new(
            vocabulary.clone(),
            translations.clone(),
            dataset,
            Arc::new(classifier),
        )
        .unwrap();
        let extractor = SymptomExtractor::new(vocabulary, translations);
        ConsoleApp::new(engine, extractor, Arc::new(KnowledgeBase::builtin()), "en")
    }

    fn drive(app: &mut ConsoleApp, script: &str) -> String {
        let mut out = Vec::new();
        app.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_to_refinement_to_result() {
        let mut app = app(MockClassifier::new(&[("Malaria", 0.55), ("Typhoid", 0.4)]));
        let out = drive(&mut app, "I have fever and headache\nconfirm\ngo\nyes\nno\nquit\n");

        assert!(out.contains("Matched: fever, headache"));
        assert!(out.contains("Selected: fever, headache"));
        assert!(out.contains("Possible conditions: Malaria 55%, Typhoid 40%"));
        assert!(out.contains("Do you also experience nausea? (yes/no/skip)"));
        assert!(out.contains("Do you also experience cough? (yes/no/skip)"));
        assert!(out.contains("Diagnosis: Malaria (55% confidence)"));
        assert!(out.contains("Emergency: YES"));
        assert!(out.contains("[Offline explanation]"));
        assert!(out.contains("Disease: Malaria"));
    }

    #[test]
    fn explanation_uses_model_when_available() {
        let client = Arc::new(MockLlmClient::new("1. OVERVIEW: a mosquito-borne illness."));
        let mut app = app(MockClassifier::new(&[("Malaria", 0.97)])).with_llm(client.clone(), "medgemma");
        let out = drive(&mut app, "add fever\ngo\n");

        assert!(out.contains("1. OVERVIEW: a mosquito-borne illness."));
        assert!(!out.contains("[Offline explanation]"));
        assert!(client.prompts().iter().any(|p| p.contains("'Malaria' in English")));
    }

    #[test]
    fn unreachable_model_falls_back_to_localized_text() {
        let offline = MockLlmClient::failing(LlmError::Timeout(10));
        let mut app = app(MockClassifier::new(&[("Malaria", 0.97)])).with_llm(Arc::new(offline), "medgemma");
        let out = drive(&mut app, "lang gu\nadd fever\ngo\n");

        assert!(out.contains("Severity: High"));
        assert!(out.contains("રોગ: Malaria"));
    }

    #[test]
    fn ai_requires_installed_model() {
        let missing = MockLlmClient::new("[]").with_models(vec!["llama3:8b".into()]);
        let app_without = app(MockClassifier::new(&[("Malaria", 0.97)]))
            .with_ai(Arc::new(missing), "medgemma");
        assert!(!app_without.ai_enabled());

        let offline = MockLlmClient::failing(LlmError::Connection("http://localhost:11434".into()));
        let app_offline = app(MockClassifier::new(&[("Malaria", 0.97)]))
            .with_ai(Arc::new(offline), "medgemma");
        assert!(!app_offline.ai_enabled());

        let installed = MockLlmClient::new("[]").with_models(vec!["medgemma:latest".into()]);
        let app_with = app(MockClassifier::new(&[("Malaria", 0.97)]))
            .with_ai(Arc::new(installed), "medgemma");
        assert!(app_with.ai_enabled());
    }

    #[test]
    fn dictionary_lists_local_names() {
        let mut app = app(MockClassifier::new(&[("Malaria", 0.97)]));
        let out = drive(&mut app, "dictionary\n");
        assert!(out.contains("English | Hindi | Gujarati"));
        assert!(out.contains("fever | ताप | તાવ"));
        assert!(out.contains("headache | सर दर्द |"));
    }

    #[test]
    fn go_without_symptoms_warns() {
        let mut app = app(MockClassifier::new(&[("Malaria", 0.95)]));
        let out = drive(&mut app, "go\nquit\n");
        assert!(out.contains("at least one symptom"));
    }

    #[test]
    fn unrecognized_text_is_reported() {
        let mut app = app(MockClassifier::new(&[("Malaria", 0.95)]));
        let out = drive(&mut app, "I feel odd\n");
        assert!(out.contains("No symptoms detected"));
    }

    #[test]
    fn classifier_failure_shows_notice() {
        let mut app = app(MockClassifier::failing(ClassifierError::Connection(
            "http://localhost:8500/predict".into(),
        )));
        let out = drive(&mut app, "add fever\ngo\n");
        assert!(out.contains("prediction service is unavailable"));
        assert!(out.contains("Type 'reset'"));
    }

    #[test]
    fn localized_info_uses_model_output() {
        let response = r#"{"type": "ચેપી", "severity": "ઉચ્ચ", "emergency": false,
            "treatment": "હોસ્પિટલ", "cost": "₹5,000", "specialist": "સામાન્ય ચિકિત્સક"}"#;
        let mut app = app(MockClassifier::new(&[("Malaria", 0.97)]))
            .with_llm(Arc::new(MockLlmClient::new(response)), "medgemma");
        let out = drive(&mut app, "lang gu-IN\nમને તાવ છે\nconfirm\ngo\n");

        assert!(out.contains("Selected: fever"));
        assert!(out.contains("Severity: ઉચ્ચ"));
        assert!(out.contains("Emergency: YES"));
    }

    #[test]
    fn reset_returns_to_input() {
        let mut app = app(MockClassifier::new(&[("Malaria", 0.97)]));
        let out = drive(&mut app, "add fever\ngo\nyes\nreset\nadd cough\n");
        assert!(out.contains("Type 'reset' to start over"));
        assert!(out.contains("Session reset."));
        assert!(out.contains("Selected: cough"));
    }
}
