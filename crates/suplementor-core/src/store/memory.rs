//! # In-Memory Store
//!
//! BTreeMap-backed implementation of both storage contracts. Used by tests
//! and as the reference behaviour the redb store must match.

use super::{
    FindOptions, GraphStore, HistoryFilter, HistoryStore, ScoredEntry, SeedLoad,
    apply_find_options,
};
use crate::text_index::TextIndex;
use crate::types::{
    GraphSnapshot, KnowledgeNode, KnowledgeRelationship, SuplementorError,
    SupplementHistoryEntry,
};
use crate::validation::{validate_history_batch, validate_history_entry, validate_snapshot};
use std::collections::BTreeMap;

/// Volatile store keeping every document in ordered maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    history: BTreeMap<String, SupplementHistoryEntry>,
    text_index: TextIndex,
    nodes: BTreeMap<String, KnowledgeNode>,
    relationships: BTreeMap<String, KnowledgeRelationship>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with history entries and a graph snapshot.
    pub fn with_content(
        history: Vec<SupplementHistoryEntry>,
        snapshot: GraphSnapshot,
    ) -> Result<Self, SuplementorError> {
        let mut store = Self::new();
        for entry in history {
            store.insert_history(entry)?;
        }
        store.replace_snapshot(snapshot)?;
        Ok(store)
    }
}

impl HistoryStore for MemoryStore {
    fn find_history(
        &self,
        filter: &HistoryFilter,
        options: &FindOptions,
    ) -> Result<Vec<SupplementHistoryEntry>, SuplementorError> {
        let matches = filter.matcher();
        let found: Vec<SupplementHistoryEntry> = self
            .history
            .values()
            .filter(|e| matches(e))
            .cloned()
            .collect();
        Ok(apply_find_options(found, options))
    }

    fn find_history_by_id(
        &self,
        id: &str,
    ) -> Result<Option<SupplementHistoryEntry>, SuplementorError> {
        Ok(self.history.get(id).cloned())
    }

    fn count_history(&self, filter: &HistoryFilter) -> Result<usize, SuplementorError> {
        let matches = filter.matcher();
        Ok(self.history.values().filter(|e| matches(e)).count())
    }

    fn text_search_history(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, SuplementorError> {
        Ok(self
            .text_index
            .search(query, limit)
            .into_iter()
            .filter_map(|hit| {
                self.history.get(&hit.id).map(|entry| ScoredEntry {
                    entry: entry.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    fn insert_history(&mut self, entry: SupplementHistoryEntry) -> Result<(), SuplementorError> {
        validate_history_entry(&entry)?;
        self.text_index.insert(&entry);
        self.history.insert(entry.id.clone(), entry);
        Ok(())
    }
}

impl GraphStore for MemoryStore {
    fn node(&self, id: &str) -> Result<Option<KnowledgeNode>, SuplementorError> {
        Ok(self.nodes.get(id).cloned())
    }

    fn nodes(&self) -> Result<Vec<KnowledgeNode>, SuplementorError> {
        Ok(self.nodes.values().cloned().collect())
    }

    fn relationships(&self) -> Result<Vec<KnowledgeRelationship>, SuplementorError> {
        Ok(self.relationships.values().cloned().collect())
    }

    fn node_count(&self) -> Result<usize, SuplementorError> {
        Ok(self.nodes.len())
    }

    fn relationship_count(&self) -> Result<usize, SuplementorError> {
        Ok(self.relationships.len())
    }

    fn replace_snapshot(&mut self, snapshot: GraphSnapshot) -> Result<(), SuplementorError> {
        validate_snapshot(&snapshot)?;
        self.nodes = snapshot
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        self.relationships = snapshot
            .relationships
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Ok(())
    }
}

impl SeedLoad for MemoryStore {
    fn load_seed(
        &mut self,
        graph: Option<GraphSnapshot>,
        history: Vec<SupplementHistoryEntry>,
    ) -> Result<(), SuplementorError> {
        validate_history_batch(&history)?;
        if let Some(snapshot) = graph {
            self.replace_snapshot(snapshot)?;
        }
        for entry in history {
            self.text_index.insert(&entry);
            self.history.insert(entry.id.clone(), entry);
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MedicineSystem;

    fn entry(id: &str, year: i32) -> SupplementHistoryEntry {
        SupplementHistoryEntry {
            id: id.into(),
            title: format!("Entry {id}"),
            polish_title: format!("Wpis {id}"),
            era: "Era".into(),
            era_start_year: year,
            era_end_year: year + 10,
            medicine_system: MedicineSystem::Ayurveda,
            geographic_region: None,
            description: "Rasayana tonics".into(),
            polish_description: "Toniki rasajana".into(),
            key_discoveries: vec![],
            notable_practitioners: vec![],
            related_supplements: vec![],
            cultural_context: None,
            sources: vec![],
            tags: vec![],
        }
    }

    #[test]
    fn insert_replaces_by_id() {
        let mut store = MemoryStore::new();
        store.insert_history(entry("a", 100)).unwrap();
        let mut updated = entry("a", 200);
        updated.title = "Charaka Samhita".into();
        store.insert_history(updated).unwrap();

        assert_eq!(store.count_history(&HistoryFilter::default()).unwrap(), 1);
        let found = store.find_history_by_id("a").unwrap().unwrap();
        assert_eq!(found.era_start_year, 200);
        assert_eq!(store.text_search_history("charaka", 5).unwrap().len(), 1);
        assert!(store.text_search_history("entry", 5).unwrap().is_empty());
    }

    #[test]
    fn insert_rejects_inverted_era() {
        let mut store = MemoryStore::new();
        let mut bad = entry("a", 100);
        bad.era_end_year = 50;
        let err = store.insert_history(bad).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.count_history(&HistoryFilter::default()).unwrap(), 0);
    }

    #[test]
    fn invalid_snapshot_leaves_graph_untouched() {
        let mut store = MemoryStore::new();
        store.replace_snapshot(GraphSnapshot::default()).unwrap();

        let mut snapshot = GraphSnapshot::default();
        snapshot.relationships.push(crate::types::KnowledgeRelationship {
            id: "r".into(),
            source_id: "missing".into(),
            target_id: "missing".into(),
            relationship_type: crate::types::RelationshipType::Enhances,
            strength: 0.5,
            confidence: 0.5,
            bidirectional: false,
            evidence_level: crate::types::EvidenceLevel::Weak,
            mechanism: "unknown".into(),
            polish_mechanism: None,
            onset: None,
            duration: None,
            reversibility: None,
            created_at: chrono::Utc::now(),
            last_updated: chrono::Utc::now(),
        });

        assert!(store.replace_snapshot(snapshot).is_err());
        assert_eq!(store.relationship_count().unwrap(), 0);
    }
}
