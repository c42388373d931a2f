//! # Text Index
//!
//! Ranked full-text lookup over history entries, keyed on title, polishTitle,
//! description, polishDescription and tags.
//!
//! Matching is on whole tokens: text is lower-cased and split on anything that
//! is not alphanumeric (Unicode aware, so Polish diacritics stay inside words).
//! A partial word therefore has no hit here, which is what makes the router's
//! substring fallback useful.
//!
//! Scoring sums field weights per matching query token occurrence:
//! titles weigh 3, tags 2, descriptions 1. Equal scores are ordered by id.

use crate::types::SupplementHistoryEntry;
use std::collections::{BTreeMap, BTreeSet};

const TITLE_WEIGHT: u32 = 3;
const TAG_WEIGHT: u32 = 2;
const DESCRIPTION_WEIGHT: u32 = 1;

/// Split text into lower-cased alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextHit {
    pub id: String,
    pub score: u32,
}

/// Inverted index: token -> (document id -> accumulated weight).
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    postings: BTreeMap<String, BTreeMap<String, u32>>,
    /// Tokens per document, so a re-index can drop stale postings.
    doc_terms: BTreeMap<String, BTreeSet<String>>,
}

impl TextIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over a set of entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a SupplementHistoryEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Number of indexed documents.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.doc_terms.len()
    }

    /// Index (or re-index) an entry.
    pub fn insert(&mut self, entry: &SupplementHistoryEntry) {
        self.remove(&entry.id);

        let mut weights: BTreeMap<String, u32> = BTreeMap::new();
        let mut add = |text: &str, weight: u32| {
            for token in tokenize(text) {
                *weights.entry(token).or_insert(0) += weight;
            }
        };
        add(&entry.title, TITLE_WEIGHT);
        add(&entry.polish_title, TITLE_WEIGHT);
        add(&entry.description, DESCRIPTION_WEIGHT);
        add(&entry.polish_description, DESCRIPTION_WEIGHT);
        for tag in &entry.tags {
            add(tag, TAG_WEIGHT);
        }

        let mut terms = BTreeSet::new();
        for (token, weight) in weights {
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(entry.id.clone(), weight);
            terms.insert(token);
        }
        self.doc_terms.insert(entry.id.clone(), terms);
    }

    /// Drop every posting of a document.
    pub fn remove(&mut self, id: &str) {
        let Some(terms) = self.doc_terms.remove(id) else {
            return;
        };
        for term in terms {
            if let Some(docs) = self.postings.get_mut(&term) {
                docs.remove(id);
                if docs.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    /// Ranked search: any query token may match (OR semantics), best first.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<TextHit> {
        let tokens: BTreeSet<String> = tokenize(query).collect();
        let mut scores: BTreeMap<&str, u32> = BTreeMap::new();

        for token in &tokens {
            if let Some(docs) = self.postings.get(token) {
                for (id, weight) in docs {
                    *scores.entry(id.as_str()).or_insert(0) += weight;
                }
            }
        }

        let mut hits: Vec<TextHit> = scores
            .into_iter()
            .map(|(id, score)| TextHit {
                id: id.to_string(),
                score,
            })
            .collect();
        // BTreeMap iteration already gives id order; the stable sort keeps it for ties.
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}
