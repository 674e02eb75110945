//! Next-question selection.
//!
//! For each still-unasked symptom, take the mean indicator per candidate disease
//! and score the symptom by the variance of those means. A symptom that is always
//! present in one candidate and absent in another splits them best.

pub mod dataset;

pub use dataset::*;

use std::collections::{BTreeMap, BTreeSet};

use crate::vocabulary::{normalize_term, SymptomId};

/// Variances closer than this are a tie. Means are summed in different orders per
/// symptom, so exact float equality would make ties depend on rounding.
const VARIANCE_EPSILON: f64 = 1e-12;

/// Pick the most informative symptom to ask about next.
///
/// Returns `None` when no dataset row belongs to a candidate or when every symptom
/// is already known or asked. Ties go to the earlier vocabulary position.
pub fn discriminate(
    candidates: &[String],
    known: &BTreeSet<SymptomId>,
    asked: &BTreeSet<SymptomId>,
    dataset: &ReferenceDataset,
) -> Option<SymptomId> {
    let wanted: BTreeSet<String> = candidates.iter().map(|c| normalize_term(c)).collect();
    let width = dataset.symptoms().len();

    // disease → (per-symptom sums, row count)
    let mut groups: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();
    for row in dataset.rows().iter().filter(|r| wanted.contains(&r.disease)) {
        let (sums, count) = groups
            .entry(row.disease.as_str())
            .or_insert_with(|| (vec![0.0; width], 0));
        for (sum, value) in sums.iter_mut().zip(&row.indicators) {
            *sum += f64::from(*value);
        }
        *count += 1;
    }

    if groups.is_empty() {
        tracing::debug!(candidates = candidates.len(), "No dataset rows for candidates");
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, symptom) in dataset.symptoms().iter().enumerate() {
        if known.contains(symptom) || asked.contains(symptom) {
            continue;
        }
        let means: Vec<f64> = groups
            .values()
            .map(|(sums, count)| sums[idx] / *count as f64)
            .collect();
        let variance = population_variance(&means);

        match best {
            Some((_, top)) if variance <= top + VARIANCE_EPSILON => {}
            _ => best = Some((idx, variance)),
        }
    }

    let (idx, variance) = best?;
    let symptom = dataset.symptoms()[idx].clone();
    tracing::debug!(
        symptom = %symptom,
        variance,
        diseases = groups.len(),
        "Discriminating symptom selected"
    );
    Some(symptom)
}

/// Population variance; anything non-finite counts as zero.
fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if variance.is_finite() {
        variance
    } else {
        0.0
    }
}
