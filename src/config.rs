use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "SymptomTriage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Classifier outputs at or below this probability are ignored.
pub const NOISE_FLOOR: f64 = 0.05;

/// A top candidate above this probability finalizes without follow-up questions.
pub const CONFIDENCE_SHORTCUT: f64 = 0.9;

/// How many classifier outputs survive into the candidate list.
pub const TOP_CANDIDATES: usize = 3;

/// Upper bound for any blocking call into an external service.
pub const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:8500/predict";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "medgemma";
pub const DEFAULT_LANGUAGE: &str = "en-IN";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "warn,triage_lib=info,symptom_triage=info"
}

/// Get the application data directory.
/// ~/SymptomTriage/ when a home directory exists, ./SymptomTriage/ otherwise.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of vocabulary, translations, dataset and disease info.
pub fn resources_dir() -> PathBuf {
    app_data_dir().join("resources")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Io(String, String),

    #[error("Failed to parse config {0}: {1}")]
    Parse(String, String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Runtime configuration. Every field has a default, so a partial JSON file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub resources_dir: PathBuf,
    pub classifier_url: String,
    pub ollama_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// When false the extraction front-end runs the local matcher only.
    pub ai_enabled: bool,
    pub language: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            resources_dir: resources_dir(),
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_SERVICE_TIMEOUT_SECS,
            ai_enabled: true,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl TriageConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
    }

    /// Defaults, then `TRIAGE_CONFIG` (if set), then `TRIAGE_*` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var("TRIAGE_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TRIAGE_*` overrides from an arbitrary lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("TRIAGE_RESOURCES_DIR") {
            self.resources_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("TRIAGE_CLASSIFIER_URL") {
            self.classifier_url = url;
        }
        if let Some(url) = lookup("TRIAGE_OLLAMA_URL") {
            self.ollama_url = url;
        }
        if let Some(model) = lookup("TRIAGE_MODEL") {
            self.model = model;
        }
        if let Some(lang) = lookup("TRIAGE_LANGUAGE") {
            self.language = lang;
        }
        if let Some(raw) = lookup("TRIAGE_TIMEOUT_SECS") {
            self.timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "TRIAGE_TIMEOUT_SECS".into(),
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup("TRIAGE_AI_ENABLED") {
            self.ai_enabled = parse_flag(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "TRIAGE_AI_ENABLED".into(),
                value: raw.clone(),
            })?;
        }
        Ok(self)
    }

    /// Service timeout, capped at the default upper bound.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, DEFAULT_SERVICE_TIMEOUT_SECS))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn resources_dir_under_app_data() {
        assert!(resources_dir().starts_with(app_data_dir()));
        assert!(resources_dir().ends_with("resources"));
    }

    #[test]
    fn thresholds_are_canonical() {
        assert!((NOISE_FLOOR - 0.05).abs() < f64::EPSILON);
        assert!((CONFIDENCE_SHORTCUT - 0.9).abs() < f64::EPSILON);
        assert_eq!(TOP_CANDIDATES, 3);
    }

    #[test]
    fn defaults_without_overrides() {
        let config = TriageConfig::default().with_overrides(|_| None).unwrap();
        assert_eq!(config, TriageConfig::default());
        assert!(config.ai_enabled);
        assert_eq!(config.timeout_secs, DEFAULT_SERVICE_TIMEOUT_SECS);
    }

    #[test]
    fn env_overrides_apply() {
        let config = TriageConfig::default()
            .with_overrides(lookup_from(&[
                ("TRIAGE_CLASSIFIER_URL", "http://10.0.0.2:9000/predict"),
                ("TRIAGE_MODEL", "llama3"),
                ("TRIAGE_TIMEOUT_SECS", "4"),
                ("TRIAGE_AI_ENABLED", "off"),
                ("TRIAGE_RESOURCES_DIR", "/opt/triage"),
            ]))
            .unwrap();
        assert_eq!(config.classifier_url, "http://10.0.0.2:9000/predict");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout_secs, 4);
        assert!(!config.ai_enabled);
        assert_eq!(config.resources_dir, PathBuf::from("/opt/triage"));
    }

    #[test]
    fn invalid_timeout_rejected() {
        let err = TriageConfig::default()
            .with_overrides(lookup_from(&[("TRIAGE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn zero_timeout_rejected() {
        let result = TriageConfig::default()
            .with_overrides(lookup_from(&[("TRIAGE_TIMEOUT_SECS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_flag_rejected() {
        let result = TriageConfig::default()
            .with_overrides(lookup_from(&[("TRIAGE_AI_ENABLED", "maybe")]));
        assert!(result.is_err());
    }

    #[test]
    fn timeout_is_capped() {
        let config = TriageConfig {
            timeout_secs: 300,
            ..TriageConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_SERVICE_TIMEOUT_SECS));
    }

    #[test]
    fn load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.json");
        std::fs::write(&path, r#"{"model": "medgemma:4b", "ai_enabled": false}"#).unwrap();

        let config = TriageConfig::load(&path).unwrap();
        assert_eq!(config.model, "medgemma:4b");
        assert!(!config.ai_enabled);
        assert_eq!(config.classifier_url, DEFAULT_CLASSIFIER_URL);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = TriageConfig::load(Path::new("/nonexistent/triage.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            TriageConfig::load(&path).unwrap_err(),
            ConfigError::Parse(..)
        ));
    }
}
