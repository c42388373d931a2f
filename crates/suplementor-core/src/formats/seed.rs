//! # Seed Bundles
//!
//! JSON documents used to populate a store offline:
//!
//! ```json
//! { "nodes": [...], "relationships": [...], "history": [...] }
//! ```
//!
//! Every key is optional. A bundle is validated as a whole (each entity, id
//! uniqueness, relationship endpoints) before anything is written, so a bad
//! bundle never leaves a store half-seeded.

use crate::store::{FindOptions, GraphStore, HistoryFilter, HistorySort, HistoryStore, SeedLoad};
use crate::types::{
    GraphSnapshot, KnowledgeNode, KnowledgeRelationship, SuplementorError, SupplementHistoryEntry,
};
use crate::validation::{ValidationErrors, validate_history_batch, validate_snapshot};
use serde::{Deserialize, Serialize};

/// Largest seed document accepted, checked before parsing.
pub const MAX_SEED_BUNDLE_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Nodes, relationships and history entries in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedBundle {
    pub nodes: Vec<KnowledgeNode>,
    pub relationships: Vec<KnowledgeRelationship>,
    pub history: Vec<SupplementHistoryEntry>,
}

/// What a seed run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub nodes: usize,
    pub relationships: usize,
    pub history: usize,
}

impl SeedBundle {
    /// Parse a bundle. Unknown enumeration tags fail here, at the boundary.
    pub fn from_json(text: &str) -> Result<Self, SuplementorError> {
        if text.len() > MAX_SEED_BUNDLE_SIZE {
            return Err(SuplementorError::SerializationError(format!(
                "seed bundle is {} bytes (limit {})",
                text.len(),
                MAX_SEED_BUNDLE_SIZE
            )));
        }
        serde_json::from_str(text).map_err(|e| SuplementorError::SerializationError(e.to_string()))
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SuplementorError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SuplementorError::SerializationError(e.to_string()))
    }

    /// Read everything a store holds, in id order.
    pub fn from_store<S: HistoryStore + GraphStore + ?Sized>(
        store: &S,
    ) -> Result<Self, SuplementorError> {
        let GraphSnapshot {
            nodes,
            relationships,
        } = store.snapshot()?;
        let history =
            store.find_history(&HistoryFilter::default(), &FindOptions::sorted(HistorySort::Unsorted))?;
        Ok(Self {
            nodes,
            relationships,
            history,
        })
    }

    /// Check every entity and the graph's referential integrity.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Err(e) = validate_history_batch(&self.history) {
            errors.violations.extend(e.violations);
        }
        let snapshot = GraphSnapshot::new(self.nodes.clone(), self.relationships.clone());
        if let Err(e) = validate_snapshot(&snapshot) {
            errors.violations.extend(e.violations);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate, then replace the graph and upsert every history entry in one
    /// store write.
    ///
    /// An empty node and relationship list leaves the existing graph in place.
    pub fn apply_to<S: SeedLoad + ?Sized>(
        self,
        store: &mut S,
    ) -> Result<SeedSummary, SuplementorError> {
        self.validate()?;

        let summary = SeedSummary {
            nodes: self.nodes.len(),
            relationships: self.relationships.len(),
            history: self.history.len(),
        };

        let graph = (!(self.nodes.is_empty() && self.relationships.is_empty()))
            .then(|| GraphSnapshot::new(self.nodes, self.relationships));
        store.load_seed(graph, self.history)?;

        tracing::info!(
            nodes = summary.nodes,
            relationships = summary.relationships,
            history = summary.history,
            "seed bundle applied"
        );
        Ok(summary)
    }
}
