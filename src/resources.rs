use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::discriminator::{DatasetError, ReferenceDataset};
use crate::knowledge::{KnowledgeBase, KnowledgeError};
use crate::vocabulary::{TranslationError, TranslationMap, Vocabulary, VocabularyError};

pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const TRANSLATIONS_FILE: &str = "translations.json";
pub const DATASET_CSV_FILE: &str = "reference_dataset.csv";
pub const DATASET_JSON_FILE: &str = "reference_dataset.json";
pub const DISEASE_INFO_FILE: &str = "disease_info.json";

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

/// Read-only reference data shared by every session.
#[derive(Clone)]
pub struct Resources {
    pub vocabulary: Arc<Vocabulary>,
    pub translations: Arc<TranslationMap>,
    pub dataset: Arc<ReferenceDataset>,
    pub knowledge: Arc<KnowledgeBase>,
}

impl Resources {
    /// Load everything from `dir`.
    ///
    /// The vocabulary and the reference dataset (CSV, or JSON when no CSV exists)
    /// are required. Without `translations.json` only the built-in colloquial
    /// tables are used; without `disease_info.json` only the built-in records.
    pub fn load(dir: &Path) -> Result<Self, ResourceError> {
        let vocabulary = Vocabulary::load(&dir.join(VOCABULARY_FILE))?;

        let translations_path = dir.join(TRANSLATIONS_FILE);
        let translations = if translations_path.exists() {
            TranslationMap::load(&translations_path)?
        } else {
            tracing::warn!(
                path = %translations_path.display(),
                "No translations file, using built-in phrase tables"
            );
            TranslationMap::builtin()
        };

        let csv_path = dir.join(DATASET_CSV_FILE);
        let dataset_path = if csv_path.exists() {
            csv_path
        } else {
            dir.join(DATASET_JSON_FILE)
        };
        let dataset = ReferenceDataset::load(&dataset_path, &vocabulary)?;

        let info_path = dir.join(DISEASE_INFO_FILE);
        let knowledge = if info_path.exists() {
            KnowledgeBase::load(&info_path)?
        } else {
            KnowledgeBase::builtin()
        };

        tracing::info!(
            dir = %dir.display(),
            symptoms = vocabulary.len(),
            hindi_phrases = translations.phrase_count("hi"),
            gujarati_phrases = translations.phrase_count("gu"),
            dataset_rows = dataset.len(),
            diseases_known = knowledge.len(),
            "Resources loaded"
        );

        Ok(Self {
            vocabulary: Arc::new(vocabulary),
            translations: Arc::new(translations),
            dataset: Arc::new(dataset),
            knowledge: Arc::new(knowledge),
        })
    }
}
