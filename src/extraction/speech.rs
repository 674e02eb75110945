use thiserror::Error;

use crate::service::ServiceOutcome;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechError {
    #[error("Listening timed out")]
    Timeout,

    #[error("Could not understand audio")]
    Unintelligible,

    #[error("No speech detected")]
    Silence,

    #[error("Speech service error: {0}")]
    Service(String),
}

/// External speech-to-text service.
pub trait SpeechRecognizer: Send + Sync {
    /// Best-effort transcript of `audio`, spoken in `language` (e.g. `"gu-IN"`).
    fn transcribe(&self, audio: &[u8], language: &str) -> Result<String, SpeechError>;
}

/// Transcribe, treating a blank transcript as silence.
///
/// There is no sensible fallback transcript, so failures are `Failed` and the
/// caller keeps the manual selection as-is.
pub fn transcribe(
    recognizer: &dyn SpeechRecognizer,
    audio: &[u8],
    language: &str,
) -> ServiceOutcome<String> {
    if audio.is_empty() {
        return ServiceOutcome::failed(SpeechError::Silence.to_string());
    }

    match recognizer.transcribe(audio, language) {
        Ok(text) if text.trim().is_empty() => ServiceOutcome::failed(SpeechError::Silence.to_string()),
        Ok(text) => {
            tracing::debug!(language, chars = text.chars().count(), "Speech recognized");
            ServiceOutcome::Ok(text.trim().to_string())
        }
        Err(e) => {
            tracing::warn!(language, error = %e, "Speech recognition failed");
            ServiceOutcome::failed(e.to_string())
        }
    }
}
