//! Term ranking for recurring-theme detection.
//!
//! A plain TF-IDF over a small corpus of journal entries. Term frequency is
//! the raw count in the document; inverse document frequency is
//! `1 + ln(N / (1 + df))`.

use std::collections::{HashMap, HashSet};

/// Terms ranked per document when looking for themes
pub const TOP_TERMS_PER_ENTRY: usize = 20;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "don", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "im", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "really", "s", "same", "she", "should", "so", "some", "such", "t", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Lower-cased alphanumeric tokens with stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// TF-IDF index over a fixed corpus
pub struct TfIdf {
    documents: Vec<HashMap<String, usize>>,
    document_frequency: HashMap<String, usize>,
}

impl TfIdf {
    pub fn new<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let documents: Vec<HashMap<String, usize>> = documents
            .into_iter()
            .map(|text| {
                let mut counts = HashMap::new();
                for token in tokenize(text) {
                    *counts.entry(token).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for doc in &documents {
            for term in doc.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            documents,
            document_frequency,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn idf(&self, term: &str) -> f64 {
        let df = self.document_frequency.get(term).copied().unwrap_or(0);
        1.0 + (self.documents.len() as f64 / (1.0 + df as f64)).ln()
    }

    /// The `n` highest-scoring terms of one document, best first.
    ///
    /// Equal scores are ordered alphabetically.
    pub fn top_terms(&self, document: usize, n: usize) -> Vec<(String, f64)> {
        let Some(doc) = self.documents.get(document) else {
            return Vec::new();
        };

        let mut scored: Vec<(String, f64)> = doc
            .iter()
            .map(|(term, &count)| (term.clone(), count as f64 * self.idf(term)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }
}

/// Terms from the newest document that also rank highly across the corpus.
///
/// `documents` must be newest first. Each of the newest document's top
/// terms is counted once per document whose own top-term list contains it.
/// Terms need at least `min_occurrences` and more than `min_chars`
/// characters. Returns at most `limit` `(term, occurrences)` pairs, most
/// frequent first, ties alphabetical.
pub fn recurring_themes(
    documents: &[&str],
    min_occurrences: usize,
    min_chars: usize,
    limit: usize,
) -> Vec<(String, usize)> {
    let index = TfIdf::new(documents.iter().copied());
    if index.is_empty() {
        return Vec::new();
    }

    let top_sets: Vec<HashSet<String>> = (0..index.len())
        .map(|i| {
            index
                .top_terms(i, TOP_TERMS_PER_ENTRY)
                .into_iter()
                .map(|(term, _)| term)
                .collect()
        })
        .collect();

    let mut themes: Vec<(String, usize)> = index
        .top_terms(0, TOP_TERMS_PER_ENTRY)
        .into_iter()
        .map(|(term, _)| {
            let occurrences = top_sets.iter().filter(|set| set.contains(&term)).count();
            (term, occurrences)
        })
        .filter(|(term, occurrences)| {
            *occurrences >= min_occurrences && term.chars().count() > min_chars
        })
        .collect();

    themes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    themes.truncate(limit);
    themes
}
