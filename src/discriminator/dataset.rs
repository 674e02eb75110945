use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::vocabulary::{normalize_term, SymptomId, Vocabulary};

/// Name of the label column in the CSV layout.
pub const DISEASE_COLUMN: &str = "diseases";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read reference dataset {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse reference dataset {0}: {1}")]
    Parse(String, String),

    #[error("Reference dataset has no 'diseases' column")]
    MissingDiseaseColumn,

    #[error("Line {line}: expected {expected} cells, found {actual}")]
    RaggedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Line {line}, column '{column}': expected 0 or 1, found '{value}'")]
    InvalidCell {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Line {0}: empty disease label")]
    EmptyLabel(usize),

    #[error("Reference dataset has no rows")]
    Empty,
}

/// One observation: a disease label and its indicators in vocabulary order.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub disease: String,
    pub indicators: Vec<u8>,
}

/// JSON layout: one record per observation, listing the symptoms present.
#[derive(Debug, Deserialize)]
struct JsonRecord {
    disease: String,
    #[serde(default)]
    symptoms: Vec<String>,
}

/// Disease × symptom indicator table, aligned to a vocabulary at load time.
///
/// Columns naming symptoms outside the vocabulary are ignored; vocabulary
/// symptoms the source never mentions read as 0. Disease labels are normalized
/// (trimmed, lowercased) so lookups from classifier output are case-insensitive.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    symptoms: Vec<SymptomId>,
    rows: Vec<DatasetRow>,
}

impl ReferenceDataset {
    /// Build from rows that are already aligned to `vocabulary`.
    pub fn from_rows(vocabulary: &Vocabulary, rows: Vec<DatasetRow>) -> Result<Self, DatasetError> {
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }
        let width = vocabulary.len();
        let mut normalized = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            let disease = normalize_term(&row.disease);
            if disease.is_empty() {
                return Err(DatasetError::EmptyLabel(i + 1));
            }
            if row.indicators.len() != width {
                return Err(DatasetError::RaggedRow {
                    line: i + 1,
                    expected: width,
                    actual: row.indicators.len(),
                });
            }
            if let Some(pos) = row.indicators.iter().position(|v| *v > 1) {
                return Err(DatasetError::InvalidCell {
                    line: i + 1,
                    column: vocabulary.terms()[pos].to_string(),
                    value: row.indicators[pos].to_string(),
                });
            }
            normalized.push(DatasetRow {
                disease,
                indicators: row.indicators,
            });
        }

        Ok(Self {
            symptoms: vocabulary.terms().to_vec(),
            rows: normalized,
        })
    }

    /// Parse the CSV layout: a `diseases` column plus one 0/1 column per symptom.
    /// Fields may be quoted, so labels such as `"Hepatitis, acute"` survive intact.
    pub fn from_csv_str(raw: &str, vocabulary: &Vocabulary) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| DatasetError::Parse("reference dataset".into(), e.to_string()))?
            .iter()
            .map(normalize_term)
            .collect();
        if columns.is_empty() {
            return Err(DatasetError::Empty);
        }

        let label_col = columns
            .iter()
            .position(|c| c == DISEASE_COLUMN)
            .ok_or(DatasetError::MissingDiseaseColumn)?;

        // Column index → vocabulary index, for columns the vocabulary knows.
        let mapping: Vec<Option<usize>> = columns
            .iter()
            .map(|c| vocabulary.index_of(&SymptomId::new(c)))
            .collect();

        let ignored = mapping
            .iter()
            .enumerate()
            .filter(|(i, m)| *i != label_col && m.is_none())
            .count();
        if ignored > 0 {
            tracing::debug!(ignored, "Dataset columns outside vocabulary ignored");
        }

        let mut rows = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record =
                result.map_err(|e| DatasetError::Parse("reference dataset".into(), e.to_string()))?;
            let line = record
                .position()
                .map_or(i + 2, |p| usize::try_from(p.line()).unwrap_or(i + 2));

            if record.len() != columns.len() {
                return Err(DatasetError::RaggedRow {
                    line,
                    expected: columns.len(),
                    actual: record.len(),
                });
            }

            let disease = normalize_term(&record[label_col]);
            if disease.is_empty() {
                return Err(DatasetError::EmptyLabel(line));
            }

            let mut indicators = vec![0u8; vocabulary.len()];
            for (col, cell) in record.iter().enumerate() {
                if col == label_col {
                    continue;
                }
                let value = match cell {
                    "0" => 0,
                    "1" => 1,
                    other => {
                        return Err(DatasetError::InvalidCell {
                            line,
                            column: columns[col].clone(),
                            value: other.to_string(),
                        })
                    }
                };
                if let Some(idx) = mapping[col] {
                    indicators[idx] = indicators[idx].max(value);
                }
            }
            rows.push(DatasetRow {
                disease,
                indicators,
            });
        }

        Self::from_rows(vocabulary, rows)
    }

    /// Parse the JSON layout: `[{"disease": "...", "symptoms": ["fever", ...]}]`.
    pub fn from_json_str(json: &str, vocabulary: &Vocabulary) -> Result<Self, DatasetError> {
        let records: Vec<JsonRecord> = serde_json::from_str(json)
            .map_err(|e| DatasetError::Parse("reference dataset".into(), e.to_string()))?;

        let rows = records
            .into_iter()
            .map(|record| {
                let mut indicators = vec![0u8; vocabulary.len()];
                for name in &record.symptoms {
                    if let Some(idx) = vocabulary.index_of(&SymptomId::new(name)) {
                        indicators[idx] = 1;
                    }
                }
                DatasetRow {
                    disease: record.disease,
                    indicators,
                }
            })
            .collect();

        Self::from_rows(vocabulary, rows)
    }

    /// Load by extension: `.json` uses the JSON layout, anything else is CSV.
    pub fn load(path: &Path, vocabulary: &Vocabulary) -> Result<Self, DatasetError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::Load(path.display().to_string(), e.to_string()))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let dataset = if is_json {
            Self::from_json_str(&raw, vocabulary)
        } else {
            Self::from_csv_str(&raw, vocabulary)
        }?;

        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            diseases = dataset.diseases().len(),
            "Reference dataset loaded"
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Symptom columns, in vocabulary order.
    pub fn symptoms(&self) -> &[SymptomId] {
        &self.symptoms
    }

    pub fn diseases(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.disease.as_str()).collect()
    }

    pub fn contains_disease(&self, label: &str) -> bool {
        let label = normalize_term(label);
        self.rows.iter().any(|r| r.disease == label)
    }

    /// Whether the columns match `vocabulary` exactly, in order.
    pub fn is_aligned_with(&self, vocabulary: &Vocabulary) -> bool {
        self.symptoms == vocabulary.terms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::new(["fever", "cough", "headache"]).unwrap()
    }

    #[test]
    fn csv_aligns_columns_to_vocabulary() {
        // Column order differs from the vocabulary, and "rash" is unknown.
        let csv = "diseases,headache,rash,fever\nMalaria,1,0,1\nflu,0,1,1\n";
        let ds = ReferenceDataset::from_csv_str(csv, &vocab()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].disease, "malaria");
        assert_eq!(ds.rows()[0].indicators, vec![1, 0, 1]);
        assert_eq!(ds.rows()[1].indicators, vec![1, 0, 0]);
        assert!(ds.is_aligned_with(&vocab()));
    }

    #[test]
    fn csv_label_column_need_not_be_first() {
        let csv = "fever,Diseases\n1,Dengue\n";
        let ds = ReferenceDataset::from_csv_str(csv, &vocab()).unwrap();
        assert!(ds.contains_disease("DENGUE"));
    }

    #[test]
    fn csv_missing_label_column() {
        let err = ReferenceDataset::from_csv_str("fever,cough\n1,0\n", &vocab()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingDiseaseColumn));
    }

    #[test]
    fn csv_ragged_row_reports_line() {
        let csv = "diseases,fever,cough\nflu,1,0\ncold,1\n";
        match ReferenceDataset::from_csv_str(csv, &vocab()).unwrap_err() {
            DatasetError::RaggedRow {
                line,
                expected,
                actual,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn csv_accepts_quoted_fields() {
        let csv = "\"diseases\",\"fever\",\"cough\"\n\"Hepatitis, acute\",1,0\nflu,1,1\n";
        let ds = ReferenceDataset::from_csv_str(csv, &vocab()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].disease, "hepatitis, acute");
        assert_eq!(ds.rows()[0].indicators, vec![1, 0, 0]);
        assert!(ds.contains_disease("Hepatitis, Acute"));
    }

    #[test]
    fn csv_rejects_non_binary_cells() {
        let csv = "diseases,fever\nflu,0.5\n";
        assert!(matches!(
            ReferenceDataset::from_csv_str(csv, &vocab()).unwrap_err(),
            DatasetError::InvalidCell { line: 2, .. }
        ));
    }

    #[test]
    fn csv_without_rows_is_empty() {
        assert!(matches!(
            ReferenceDataset::from_csv_str("diseases,fever\n", &vocab()).unwrap_err(),
            DatasetError::Empty
        ));
    }

    #[test]
    fn json_layout_lists_present_symptoms() {
        let json = r#"[
            {"disease": "Flu", "symptoms": ["fever", "cough", "sneezing"]},
            {"disease": "Migraine", "symptoms": ["headache"]}
        ]"#;
        let ds = ReferenceDataset::from_json_str(json, &vocab()).unwrap();
        assert_eq!(ds.rows()[0].indicators, vec![1, 1, 0]);
        assert_eq!(ds.rows()[1].indicators, vec![0, 0, 1]);
        assert_eq!(ds.diseases().into_iter().collect::<Vec<_>>(), vec!["flu", "migraine"]);
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("reference_dataset.csv");
        std::fs::write(&csv_path, "diseases,fever\nflu,1\n").unwrap();
        let json_path = dir.path().join("reference_dataset.json");
        std::fs::write(&json_path, r#"[{"disease":"flu","symptoms":["fever"]}]"#).unwrap();

        let v = vocab();
        assert_eq!(ReferenceDataset::load(&csv_path, &v).unwrap().len(), 1);
        assert_eq!(ReferenceDataset::load(&json_path, &v).unwrap().len(), 1);
    }

    #[test]
    fn load_missing_file() {
        let err = ReferenceDataset::load(Path::new("/nonexistent/data.csv"), &vocab()).unwrap_err();
        assert!(matches!(err, DatasetError::Load(..)));
    }
}
