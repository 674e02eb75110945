use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ClassifierError, DiseaseClassifier, LabelScore};
use crate::vocabulary::{normalize_term, SymptomVector};

/// Blocking HTTP client for a remote disease classifier.
///
/// Contract: `POST {url}` with `{"vector": [0,1,...]}`; the service answers
/// `{"predictions": [{"label": "...", "probability": 0.42}, ...]}` in its own
/// label order. Failures are reported, never retried.
pub struct HttpClassifier {
    url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    input_len: Option<usize>,
    labels: Option<HashSet<String>>,
}

impl HttpClassifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::HttpClient(e.to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
            input_len: None,
            labels: None,
        })
    }

    /// Reject vectors of the wrong length before they reach the service.
    pub fn with_input_len(mut self, len: usize) -> Self {
        self.input_len = Some(len);
        self
    }

    /// Drop any returned label outside this set (compared case-insensitively).
    pub fn with_label_whitelist<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.labels = Some(labels.into_iter().map(|l| normalize_term(l.as_ref())).collect());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    vector: &'a [u8],
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<RawPrediction>,
}

#[derive(Deserialize)]
struct RawPrediction {
    label: String,
    probability: f64,
}

impl DiseaseClassifier for HttpClassifier {
    fn predict(&self, vector: &SymptomVector) -> Result<Vec<LabelScore>, ClassifierError> {
        if let Some(expected) = self.input_len {
            if vector.len() != expected {
                return Err(ClassifierError::VectorLength {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let body = PredictRequest {
            vector: vector.as_slice(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ClassifierError::Connection(self.url.clone())
                } else if e.is_timeout() {
                    ClassifierError::Timeout(self.timeout_secs)
                } else {
                    ClassifierError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClassifierError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;
        parse_predictions(&text, self.labels.as_ref())
    }
}

/// Parse and validate a classifier response body. `whitelist` holds normalized labels.
pub fn parse_predictions(
    body: &str,
    whitelist: Option<&HashSet<String>>,
) -> Result<Vec<LabelScore>, ClassifierError> {
    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    let mut scores = Vec::with_capacity(parsed.predictions.len());
    for raw in parsed.predictions {
        if !raw.probability.is_finite() || !(0.0..=1.0).contains(&raw.probability) {
            return Err(ClassifierError::MalformedResponse(format!(
                "probability {} for '{}' outside [0, 1]",
                raw.probability, raw.label
            )));
        }
        if let Some(allowed) = whitelist {
            if !allowed.contains(&normalize_term(&raw.label)) {
                tracing::debug!(label = %raw.label, "Dropping label outside whitelist");
                continue;
            }
        }
        scores.push(LabelScore {
            label: raw.label,
            probability: raw.probability,
        });
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::Vocabulary;

    #[test]
    fn constructor_trims_trailing_slash() {
        let c = HttpClassifier::new("http://localhost:8500/predict/", Duration::from_secs(5)).unwrap();
        assert_eq!(c.url(), "http://localhost:8500/predict");
        assert_eq!(c.timeout_secs, 5);
    }

    #[test]
    fn wrong_vector_length_rejected_without_request() {
        let vocab = Vocabulary::new(["fever", "cough"]).unwrap();
        let vector = vocab.encode(&Default::default()).unwrap();
        // Port 9 is discard; the length check must fire before any I/O.
        let c = HttpClassifier::new("http://127.0.0.1:9/predict", Duration::from_secs(1))
            .unwrap()
            .with_input_len(3);
        assert_eq!(
            c.predict(&vector).unwrap_err(),
            ClassifierError::VectorLength {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn parse_valid_response() {
        let body = r#"{"predictions": [
            {"label": "Malaria", "probability": 0.6},
            {"label": "Dengue", "probability": 0.4}
        ]}"#;
        let scores = parse_predictions(body, None).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0], LabelScore::new("Malaria", 0.6));
    }

    #[test]
    fn parse_rejects_out_of_range_probability() {
        let body = r#"{"predictions": [{"label": "Malaria", "probability": 1.7}]}"#;
        assert!(matches!(
            parse_predictions(body, None).unwrap_err(),
            ClassifierError::MalformedResponse(_)
        ));
    }

    #[test]
    fn parse_rejects_wrong_schema() {
        assert!(parse_predictions(r#"{"labels": ["a"]}"#, None).is_err());
        assert!(parse_predictions("not json", None).is_err());
    }

    #[test]
    fn whitelist_drops_unknown_labels() {
        let allowed: HashSet<String> = ["malaria".to_string()].into_iter().collect();
        let body = r#"{"predictions": [
            {"label": "Malaria", "probability": 0.5},
            {"label": "Hallucinated", "probability": 0.5}
        ]}"#;
        let scores = parse_predictions(body, Some(&allowed)).unwrap();
        assert_eq!(scores, vec![LabelScore::new("Malaria", 0.5)]);
    }

    #[test]
    fn unreachable_service_is_error_not_panic() {
        let vocab = Vocabulary::new(["fever"]).unwrap();
        let vector = vocab.encode(&Default::default()).unwrap();
        let c = HttpClassifier::new("http://127.0.0.1:1/predict", Duration::from_secs(1)).unwrap();
        assert!(c.predict(&vector).is_err());
    }
}
