//! Two-phase symptom selection buffer.
//!
//! Extraction stages its result together with whatever is already selected;
//! `commit` drains the stage into the live selection once. A second commit in
//! the same input cycle finds nothing staged and changes nothing.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::vocabulary::SymptomId;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymptomSelection {
    live: BTreeSet<SymptomId>,
    pending: Option<BTreeSet<SymptomId>>,
}

impl SymptomSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current committed selection.
    pub fn live(&self) -> &BTreeSet<SymptomId> {
        &self.live
    }

    pub fn pending(&self) -> Option<&BTreeSet<SymptomId>> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Manual pick from the symptom list.
    pub fn select(&mut self, symptom: SymptomId) -> bool {
        self.live.insert(symptom)
    }

    pub fn deselect(&mut self, symptom: &SymptomId) -> bool {
        self.live.remove(symptom)
    }

    /// Stage `new` merged with the live selection and anything already staged.
    /// Empty input stages nothing.
    pub fn stage(&mut self, new: &BTreeSet<SymptomId>) {
        if new.is_empty() {
            return;
        }
        let mut merged = self.pending.take().unwrap_or_default();
        merged.extend(self.live.iter().cloned());
        merged.extend(new.iter().cloned());
        self.pending = Some(merged);
    }

    /// Apply the staged set to the live selection. Returns whether anything was applied.
    pub fn commit(&mut self) -> bool {
        match self.pending.take() {
            Some(staged) => {
                self.live = staged;
                true
            }
            None => false,
        }
    }

    /// Throw away the staged set (the user rejected the detected symptoms).
    pub fn discard(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.pending = None;
    }
}
