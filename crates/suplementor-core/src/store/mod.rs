//! # Persistence Adapter
//!
//! The read/write contract the routers depend on, plus two implementations:
//! - [`MemoryStore`]: BTreeMap-backed, volatile
//! - [`RedbStore`]: disk-backed document store on redb
//!
//! Calls either resolve with data or fail with a store error; there are no
//! partial results and nothing in this module retries.

mod connection;
mod memory;
mod redb_store;

pub use connection::LazyConnection;
pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::types::{
    GraphSnapshot, KnowledgeNode, KnowledgeRelationship, MedicineSystem, SuplementorError,
    SupplementHistoryEntry, TimelineEntry,
};
use std::sync::Arc;

// =============================================================================
// HISTORY QUERIES
// =============================================================================

/// Conjunctive filter over history entries. `None` fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Exact medicine-system match.
    pub medicine_system: Option<MedicineSystem>,
    /// Inclusive lower bound on `era_start_year`.
    pub era_start_from: Option<i32>,
    /// Inclusive upper bound on `era_start_year`.
    pub era_start_to: Option<i32>,
    /// Entry must list this supplement id in `related_supplements`.
    pub related_supplement: Option<String>,
    /// Case-insensitive substring over titles, descriptions and tags (ORed).
    pub contains: Option<String>,
}

impl HistoryFilter {
    /// Filter on a single medicine system.
    #[must_use]
    pub fn system(system: MedicineSystem) -> Self {
        Self {
            medicine_system: Some(system),
            ..Self::default()
        }
    }

    /// Build a predicate checking every populated field, with the substring
    /// needle lower-cased once.
    pub fn matcher(&self) -> impl Fn(&SupplementHistoryEntry) -> bool + '_ {
        let needle = self.contains.as_ref().map(|c| c.to_lowercase());
        move |entry| {
            if self
                .medicine_system
                .is_some_and(|s| s != entry.medicine_system)
            {
                return false;
            }
            if self.era_start_from.is_some_and(|from| entry.era_start_year < from) {
                return false;
            }
            if self.era_start_to.is_some_and(|to| entry.era_start_year > to) {
                return false;
            }
            if let Some(supplement) = &self.related_supplement {
                if !entry.related_supplements.iter().any(|s| s == supplement) {
                    return false;
                }
            }
            if let Some(needle) = &needle {
                if !entry.matches_text(needle) {
                    return false;
                }
            }
            true
        }
    }
}

/// Sort order for history results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistorySort {
    /// `era_start_year` ascending, then `title` ascending.
    #[default]
    EraThenTitle,
    /// `era_start_year` ascending only; ties keep id order.
    Era,
    /// Store order (id order for both bundled stores).
    Unsorted,
}

/// Sorting and pagination applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub sort: HistorySort,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    #[must_use]
    pub fn sorted(sort: HistorySort) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(sort: HistorySort, skip: usize, limit: usize) -> Self {
        Self {
            sort,
            skip,
            limit: Some(limit),
        }
    }
}

/// Fields history results are sorted on.
pub trait EraOrdered {
    fn era_start_year(&self) -> i32;
    fn title(&self) -> &str;
}

impl EraOrdered for SupplementHistoryEntry {
    fn era_start_year(&self) -> i32 {
        self.era_start_year
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl EraOrdered for TimelineEntry {
    fn era_start_year(&self) -> i32 {
        self.era_start_year
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// Sort, skip and limit a filtered result set.
///
/// Input is expected in id order; sorts are stable so ties keep that order.
pub fn apply_find_options<T: EraOrdered>(mut items: Vec<T>, options: &FindOptions) -> Vec<T> {
    match options.sort {
        HistorySort::EraThenTitle => items.sort_by(|a, b| {
            a.era_start_year()
                .cmp(&b.era_start_year())
                .then_with(|| a.title().cmp(b.title()))
        }),
        HistorySort::Era => items.sort_by_key(|item| item.era_start_year()),
        HistorySort::Unsorted => {}
    }
    let limit = options.limit.unwrap_or(usize::MAX);
    items.into_iter().skip(options.skip).take(limit).collect()
}

/// A ranked text-search hit resolved to its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEntry {
    pub entry: SupplementHistoryEntry,
    pub score: u32,
}

/// Storage contract for supplement history entries.
pub trait HistoryStore {
    /// Filtered, sorted, paginated entries.
    fn find_history(
        &self,
        filter: &HistoryFilter,
        options: &FindOptions,
    ) -> Result<Vec<SupplementHistoryEntry>, SuplementorError>;

    /// Single entry by id; `Ok(None)` when absent.
    fn find_history_by_id(&self, id: &str)
    -> Result<Option<SupplementHistoryEntry>, SuplementorError>;

    /// Number of entries matching `filter`.
    fn count_history(&self, filter: &HistoryFilter) -> Result<usize, SuplementorError>;

    /// Timeline projection of matching entries, sorted by `era_start_year`.
    fn find_timeline(&self, filter: &HistoryFilter) -> Result<Vec<TimelineEntry>, SuplementorError> {
        Ok(self
            .find_history(filter, &FindOptions::sorted(HistorySort::Era))?
            .iter()
            .map(SupplementHistoryEntry::to_timeline)
            .collect())
    }

    /// Ranked full-text search, best first, at most `limit` hits.
    fn text_search_history(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, SuplementorError>;

    /// Insert or replace an entry by id.
    fn insert_history(&mut self, entry: SupplementHistoryEntry) -> Result<(), SuplementorError>;
}

// =============================================================================
// GRAPH QUERIES
// =============================================================================

/// Storage contract for the knowledge graph.
pub trait GraphStore {
    /// Single node by id; `Ok(None)` when absent.
    fn node(&self, id: &str) -> Result<Option<KnowledgeNode>, SuplementorError>;

    /// Every node, in id order.
    fn nodes(&self) -> Result<Vec<KnowledgeNode>, SuplementorError>;

    /// Every relationship, in id order.
    fn relationships(&self) -> Result<Vec<KnowledgeRelationship>, SuplementorError>;

    fn node_count(&self) -> Result<usize, SuplementorError>;

    fn relationship_count(&self) -> Result<usize, SuplementorError>;

    /// Relationships with `node_id` as either endpoint.
    fn relationships_of(&self, node_id: &str) -> Result<Vec<KnowledgeRelationship>, SuplementorError> {
        Ok(self
            .relationships()?
            .into_iter()
            .filter(|r| r.touches(node_id))
            .collect())
    }

    /// The full node + relationship set.
    fn snapshot(&self) -> Result<GraphSnapshot, SuplementorError> {
        Ok(GraphSnapshot::new(self.nodes()?, self.relationships()?))
    }

    /// Replace the whole graph. The snapshot is validated first; on failure
    /// nothing is written.
    fn replace_snapshot(&mut self, snapshot: GraphSnapshot) -> Result<(), SuplementorError>;
}

// =============================================================================
// BULK LOAD
// =============================================================================

/// All-or-nothing bulk write used by seeding.
pub trait SeedLoad: HistoryStore + GraphStore {
    /// Replace the graph (when `graph` is given) and upsert every entry of
    /// `history` as one unit. Everything is validated before the first write;
    /// on any failure the store is left as it was.
    fn load_seed(
        &mut self,
        graph: Option<GraphSnapshot>,
        history: Vec<SupplementHistoryEntry>,
    ) -> Result<(), SuplementorError>;
}

// =============================================================================
// SHARED HANDLE
// =============================================================================

/// A store that serves both routers and can be shared across threads.
pub trait ContentStore: HistoryStore + GraphStore + Send + Sync {}

impl<T: HistoryStore + GraphStore + Send + Sync> ContentStore for T {}

/// The shared, read-only store handle used by request handlers.
pub type SharedStore = Arc<dyn ContentStore>;

#[cfg(test)]
mod tests {
    use super::*;

    impl EraOrdered for (i32, &'static str) {
        fn era_start_year(&self) -> i32 {
            self.0
        }

        fn title(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn apply_find_options_sorts_then_paginates() {
        let items = vec![(300, "b"), (-100, "z"), (300, "a"), (0, "m")];
        let page = apply_find_options(items, &FindOptions::page(HistorySort::EraThenTitle, 1, 2));
        assert_eq!(page, vec![(0, "m"), (300, "a")]);
    }

    #[test]
    fn era_sort_is_stable_for_ties() {
        let items = vec![(5, "second"), (1, "first"), (5, "third")];
        let sorted = apply_find_options(items, &FindOptions::sorted(HistorySort::Era));
        assert_eq!(sorted, vec![(1, "first"), (5, "second"), (5, "third")]);
    }

    #[test]
    fn skip_past_end_is_empty() {
        let items = vec![(1, "a")];
        let page = apply_find_options(items, &FindOptions::page(HistorySort::Unsorted, 5, 10));
        assert!(page.is_empty());
    }
}
