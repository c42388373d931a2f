//! # History Router
//!
//! Read-only procedures over supplement history entries.
//!
//! Every procedure takes a raw input as it arrives from a client, validates it
//! completely (collecting every violated field) and only then touches the
//! store. Store errors are returned unchanged.

use crate::primitives::{
    HISTORY_LIST_DEFAULT_LIMIT, HISTORY_LIST_MAX_LIMIT, HISTORY_SEARCH_DEFAULT_LIMIT,
    HISTORY_SEARCH_MAX_LIMIT, MAX_QUERY_LENGTH,
};
use crate::store::{FindOptions, HistoryFilter, HistorySort, HistoryStore};
use crate::types::{MedicineSystem, SuplementorError, SupplementHistoryEntry, TimelineEntry};
use crate::validation::{ValidationErrors, Validator};
use serde::{Deserialize, Serialize};

// =============================================================================
// INPUTS
// =============================================================================

/// `listHistory` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListHistoryInput {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl ListHistoryInput {
    pub fn validate(&self) -> Result<FindOptions, ValidationErrors> {
        let mut v = Validator::new();
        let limit = v.bounded(
            "limit",
            self.limit,
            1,
            HISTORY_LIST_MAX_LIMIT,
            HISTORY_LIST_DEFAULT_LIMIT,
        );
        let skip = v.at_least("skip", self.skip, 0, 0);
        v.finish(FindOptions::page(HistorySort::EraThenTitle, skip, limit))
    }
}

/// `getHistoryById` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetHistoryByIdInput {
    pub id: String,
}

/// `listByMedicineSystem` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListByMedicineSystemInput {
    pub system: String,
    pub era_start_from: Option<i32>,
    pub era_start_to: Option<i32>,
}

impl ListByMedicineSystemInput {
    pub fn validate(&self) -> Result<HistoryFilter, ValidationErrors> {
        let mut v = Validator::new();
        let system = v.tag::<MedicineSystem>("system", &self.system);
        if let (Some(from), Some(to)) = (self.era_start_from, self.era_start_to) {
            if from > to {
                v.push("eraStartTo", "must not be earlier than eraStartFrom");
            }
        }
        v.finish(HistoryFilter {
            medicine_system: system,
            era_start_from: self.era_start_from,
            era_start_to: self.era_start_to,
            ..HistoryFilter::default()
        })
    }
}

/// `getTimeline` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineInput {
    pub system: Option<String>,
}

impl TimelineInput {
    pub fn validate(&self) -> Result<HistoryFilter, ValidationErrors> {
        let mut v = Validator::new();
        let system = self
            .system
            .as_deref()
            .and_then(|s| v.tag::<MedicineSystem>("system", s));
        v.finish(HistoryFilter {
            medicine_system: system,
            ..HistoryFilter::default()
        })
    }
}

/// `getRelatedHistory` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelatedHistoryInput {
    pub supplement_id: String,
}

/// `search` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchHistoryInput {
    pub query: String,
    pub limit: Option<i64>,
}

impl SearchHistoryInput {
    /// Returns the trimmed query and the resolved limit.
    pub fn validate(&self) -> Result<(String, usize), ValidationErrors> {
        let mut v = Validator::new();
        let query = self.query.trim();
        v.non_empty("query", query);
        if query.len() > MAX_QUERY_LENGTH {
            v.push("query", format!("must be at most {} bytes", MAX_QUERY_LENGTH));
        }
        let limit = v.bounded(
            "limit",
            self.limit,
            1,
            HISTORY_SEARCH_MAX_LIMIT,
            HISTORY_SEARCH_DEFAULT_LIMIT,
        );
        v.finish((query.to_string(), limit))
    }
}

// =============================================================================
// OUTPUTS
// =============================================================================

/// How a search result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMode {
    /// Relevance-ordered hits from the text index.
    Ranked,
    /// The index had no hit; entries matched by plain substring, in store order.
    Fallback,
}

/// Result of `search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub entries: Vec<SupplementHistoryEntry>,
    pub mode: SearchMode,
}

// =============================================================================
// ROUTER
// =============================================================================

/// History procedures bound to a store.
pub struct HistoryRouter<'a, S: HistoryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: HistoryStore + ?Sized> HistoryRouter<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Entries by era then title, paginated. An empty page is not an error.
    pub fn list_history(
        &self,
        input: &ListHistoryInput,
    ) -> Result<Vec<SupplementHistoryEntry>, SuplementorError> {
        let options = input.validate()?;
        self.store.find_history(&HistoryFilter::default(), &options)
    }

    /// Single entry, or `None` when no entry has this id.
    pub fn get_history_by_id(
        &self,
        input: &GetHistoryByIdInput,
    ) -> Result<Option<SupplementHistoryEntry>, SuplementorError> {
        let mut v = Validator::new();
        v.id("id", &input.id);
        v.finish(())?;
        self.store.find_history_by_id(&input.id)
    }

    /// Entries of one medicine system, optionally bounded by start year.
    pub fn list_by_medicine_system(
        &self,
        input: &ListByMedicineSystemInput,
    ) -> Result<Vec<SupplementHistoryEntry>, SuplementorError> {
        let filter = input.validate()?;
        self.store
            .find_history(&filter, &FindOptions::sorted(HistorySort::EraThenTitle))
    }

    /// Timeline projection, oldest first.
    pub fn get_timeline(&self, input: &TimelineInput) -> Result<Vec<TimelineEntry>, SuplementorError> {
        let filter = input.validate()?;
        self.store.find_timeline(&filter)
    }

    /// Entries that reference a supplement, oldest first.
    pub fn get_related_history(
        &self,
        input: &RelatedHistoryInput,
    ) -> Result<Vec<SupplementHistoryEntry>, SuplementorError> {
        let mut v = Validator::new();
        v.id("supplementId", &input.supplement_id);
        v.finish(())?;
        let filter = HistoryFilter {
            related_supplement: Some(input.supplement_id.clone()),
            ..HistoryFilter::default()
        };
        self.store
            .find_history(&filter, &FindOptions::sorted(HistorySort::Era))
    }

    /// Ranked search, degrading to substring matching when the index has no hit.
    pub fn search(&self, input: &SearchHistoryInput) -> Result<SearchResult, SuplementorError> {
        let (query, limit) = input.validate()?;

        let ranked = self.store.text_search_history(&query, limit)?;
        if !ranked.is_empty() {
            return Ok(SearchResult {
                entries: ranked.into_iter().map(|hit| hit.entry).collect(),
                mode: SearchMode::Ranked,
            });
        }

        let filter = HistoryFilter {
            contains: Some(query.clone()),
            ..HistoryFilter::default()
        };
        let entries = self
            .store
            .find_history(&filter, &FindOptions::page(HistorySort::Unsorted, 0, limit))?;
        tracing::debug!(
            query = %query,
            hits = entries.len(),
            search_mode = "fallback",
            "text index had no hit"
        );
        Ok(SearchResult {
            entries,
            mode: SearchMode::Fallback,
        })
    }
}
