//! Deterministic keyword matcher.
//!
//! Every vocabulary term and every translation phrase for the input language is
//! tried longest-first against the normalized text. A matched span is blanked in
//! the working copy, so "stomach pain" consumes its text before "pain" is tried.
//!
//! A match must start at a word boundary. Latin-script phrases may run on into a
//! suffix ("headaches", "coughing"); other scripts must also end at a boundary,
//! so Hindi "ताप" does not fire inside "तापमान".

use std::collections::BTreeSet;

use crate::vocabulary::{normalize_term, SymptomId, TranslationMap, Vocabulary};

/// Match `text` against the vocabulary and the phrase table for `language`.
/// Translation phrases whose target is not in the vocabulary are ignored.
pub fn match_local(
    text: &str,
    language: &str,
    vocabulary: &Vocabulary,
    translations: &TranslationMap,
) -> BTreeSet<SymptomId> {
    let mut working = normalize_term(text);
    let mut found = BTreeSet::new();
    if working.is_empty() {
        return found;
    }

    let mut phrases: Vec<(&str, &SymptomId)> = vocabulary
        .terms()
        .iter()
        .map(|term| (term.as_str(), term))
        .chain(
            translations
                .phrases(language)
                .into_iter()
                .filter(|(_, symptom)| vocabulary.contains(symptom)),
        )
        .collect();

    // Longest first; equal lengths in lexicographic order so the scan is reproducible.
    phrases.sort_by(|(a, _), (b, _)| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });

    for (phrase, symptom) in phrases {
        if !phrase.is_empty() && blank_matches(&mut working, phrase) {
            found.insert(symptom.clone());
        }
    }

    found
}

/// Letters, digits and the Indic marks that `char::is_alphanumeric` misses.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '\u{093C}' | '\u{094D}' | '\u{0ABC}' | '\u{0ACD}')
}

/// Blank every occurrence of `phrase` that sits on word boundaries.
fn blank_matches(working: &mut String, phrase: &str) -> bool {
    let open_ended = phrase.is_ascii();
    let starts: Vec<usize> = working
        .match_indices(phrase)
        .map(|(start, _)| start)
        .filter(|&start| {
            let end = start + phrase.len();
            let before_ok = !working[..start].chars().next_back().is_some_and(is_word_char);
            let after_ok =
                open_ended || !working[end..].chars().next().is_some_and(is_word_char);
            before_ok && after_ok
        })
        .collect();

    let blank = " ".repeat(phrase.chars().count());
    for &start in starts.iter().rev() {
        working.replace_range(start..start + phrase.len(), &blank);
    }
    !starts.is_empty()
}
