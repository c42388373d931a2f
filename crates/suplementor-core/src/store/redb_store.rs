//! # redb-backed Document Store
//!
//! A disk-backed document store using the redb embedded database.
//!
//! Each collection is a table keyed by document id holding postcard-encoded
//! documents:
//! - `history`: full [`SupplementHistoryEntry`] documents
//! - `history_timeline`: the [`TimelineEntry`] projection of each entry, written
//!   alongside the full document so timeline reads never decode full entries
//! - `nodes` / `relationships`: the knowledge graph snapshot
//!
//! The text index lives in memory and is rebuilt from the `history` table on
//! open, the same way the id caches of an embedded store are warmed.

use super::{
    FindOptions, GraphStore, HistoryFilter, HistorySort, HistoryStore, ScoredEntry, SeedLoad,
    apply_find_options,
};
use crate::text_index::TextIndex;
use crate::types::{
    GraphSnapshot, KnowledgeNode, KnowledgeRelationship, SuplementorError,
    SupplementHistoryEntry, TimelineEntry,
};
use crate::validation::{validate_history_batch, validate_history_entry, validate_snapshot};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Every collection maps a string id to an encoded document.
type DocumentTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Table for history entries: id -> serialized SupplementHistoryEntry
const HISTORY: DocumentTable = TableDefinition::new("history");

/// Table for the timeline projection: id -> serialized TimelineEntry
const HISTORY_TIMELINE: DocumentTable = TableDefinition::new("history_timeline");

/// Table for graph nodes: id -> serialized KnowledgeNode
const NODES: DocumentTable = TableDefinition::new("nodes");

/// Table for graph relationships: id -> serialized KnowledgeRelationship
const RELATIONSHIPS: DocumentTable = TableDefinition::new("relationships");

fn store_err(e: impl std::fmt::Display) -> SuplementorError {
    SuplementorError::StoreError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SuplementorError> {
    postcard::to_allocvec(value).map_err(|e| SuplementorError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SuplementorError> {
    postcard::from_bytes(bytes).map_err(|e| SuplementorError::SerializationError(e.to_string()))
}

/// A disk-backed content store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Ranked text index over the `history` table.
    text_index: TextIndex,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("indexed_entries", &self.text_index.len())
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a content database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SuplementorError> {
        let db = Database::create(path.as_ref()).map_err(store_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(store_err)?;
            let _ = write_txn.open_table(HISTORY).map_err(store_err)?;
            let _ = write_txn.open_table(HISTORY_TIMELINE).map_err(store_err)?;
            let _ = write_txn.open_table(NODES).map_err(store_err)?;
            let _ = write_txn.open_table(RELATIONSHIPS).map_err(store_err)?;
            write_txn.commit().map_err(store_err)?;
        }

        let mut store = Self {
            db,
            text_index: TextIndex::new(),
        };
        let entries = store.scan::<SupplementHistoryEntry>(HISTORY)?;
        store.text_index = TextIndex::from_entries(&entries);

        tracing::debug!(
            path = %path.as_ref().display(),
            history_entries = entries.len(),
            "opened redb content store"
        );
        Ok(store)
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), SuplementorError> {
        self.db.compact().map_err(store_err)?;
        Ok(())
    }

    /// Decode every document of a table, in key order.
    fn scan<T: DeserializeOwned>(
        &self,
        table: DocumentTable,
    ) -> Result<Vec<T>, SuplementorError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(table).map_err(store_err)?;
        let mut docs = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, value) = entry.map_err(store_err)?;
            docs.push(decode(value.value())?);
        }
        Ok(docs)
    }

    /// Decode a single document by id.
    fn get<T: DeserializeOwned>(
        &self,
        table: DocumentTable,
        id: &str,
    ) -> Result<Option<T>, SuplementorError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(table).map_err(store_err)?;
        match table.get(id).map_err(store_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn len(&self, table: DocumentTable) -> Result<usize, SuplementorError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(table).map_err(store_err)?;
        Ok(table.len().map_err(store_err)? as usize)
    }
}

/// True if the timeline projection carries every field the filter reads.
fn projection_covers(filter: &HistoryFilter) -> bool {
    filter.related_supplement.is_none() && filter.contains.is_none()
}

fn timeline_matches(filter: &HistoryFilter, entry: &TimelineEntry) -> bool {
    filter
        .medicine_system
        .is_none_or(|s| s == entry.medicine_system)
        && filter
            .era_start_from
            .is_none_or(|from| entry.era_start_year >= from)
        && filter.era_start_to.is_none_or(|to| entry.era_start_year <= to)
}

impl HistoryStore for RedbStore {
    fn find_history(
        &self,
        filter: &HistoryFilter,
        options: &FindOptions,
    ) -> Result<Vec<SupplementHistoryEntry>, SuplementorError> {
        let matches = filter.matcher();
        let found: Vec<SupplementHistoryEntry> = self
            .scan::<SupplementHistoryEntry>(HISTORY)?
            .into_iter()
            .filter(|e| matches(e))
            .collect();
        Ok(apply_find_options(found, options))
    }

    fn find_history_by_id(
        &self,
        id: &str,
    ) -> Result<Option<SupplementHistoryEntry>, SuplementorError> {
        self.get(HISTORY, id)
    }

    fn count_history(&self, filter: &HistoryFilter) -> Result<usize, SuplementorError> {
        if *filter == HistoryFilter::default() {
            return self.len(HISTORY);
        }
        let matches = filter.matcher();
        Ok(self
            .scan::<SupplementHistoryEntry>(HISTORY)?
            .iter()
            .filter(|e| matches(e))
            .count())
    }

    fn find_timeline(&self, filter: &HistoryFilter) -> Result<Vec<TimelineEntry>, SuplementorError> {
        if !projection_covers(filter) {
            let matches = filter.matcher();
            let found: Vec<TimelineEntry> = self
                .scan::<SupplementHistoryEntry>(HISTORY)?
                .iter()
                .filter(|e| matches(e))
                .map(SupplementHistoryEntry::to_timeline)
                .collect();
            return Ok(apply_find_options(found, &FindOptions::sorted(HistorySort::Era)));
        }
        let found: Vec<TimelineEntry> = self
            .scan::<TimelineEntry>(HISTORY_TIMELINE)?
            .into_iter()
            .filter(|e| timeline_matches(filter, e))
            .collect();
        Ok(apply_find_options(found, &FindOptions::sorted(HistorySort::Era)))
    }

    fn text_search_history(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, SuplementorError> {
        let mut scored = Vec::new();
        for hit in self.text_index.search(query, limit) {
            // The index is only updated after a committed write, so a miss
            // here means the table changed underneath us; skip it.
            if let Some(entry) = self.get::<SupplementHistoryEntry>(HISTORY, &hit.id)? {
                scored.push(ScoredEntry {
                    entry,
                    score: hit.score,
                });
            }
        }
        Ok(scored)
    }

    fn insert_history(&mut self, entry: SupplementHistoryEntry) -> Result<(), SuplementorError> {
        validate_history_entry(&entry)?;
        let encoded = encode_history(std::slice::from_ref(&entry))?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        write_history(&write_txn, &encoded)?;
        write_txn.commit().map_err(store_err)?;

        self.text_index.insert(&entry);
        Ok(())
    }
}

impl GraphStore for RedbStore {
    fn node(&self, id: &str) -> Result<Option<KnowledgeNode>, SuplementorError> {
        self.get(NODES, id)
    }

    fn nodes(&self) -> Result<Vec<KnowledgeNode>, SuplementorError> {
        self.scan(NODES)
    }

    fn relationships(&self) -> Result<Vec<KnowledgeRelationship>, SuplementorError> {
        self.scan(RELATIONSHIPS)
    }

    fn node_count(&self) -> Result<usize, SuplementorError> {
        self.len(NODES)
    }

    fn relationship_count(&self) -> Result<usize, SuplementorError> {
        self.len(RELATIONSHIPS)
    }

    /// Replace the graph in a single write transaction.
    fn replace_snapshot(&mut self, snapshot: GraphSnapshot) -> Result<(), SuplementorError> {
        validate_snapshot(&snapshot)?;
        let graph = encode_graph(&snapshot)?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        write_graph(&write_txn, &graph)?;
        write_txn.commit().map_err(store_err)?;

        tracing::info!(
            nodes = graph.nodes.len(),
            relationships = graph.relationships.len(),
            "replaced knowledge graph snapshot"
        );
        Ok(())
    }
}

impl SeedLoad for RedbStore {
    /// Graph, history and timeline tables are written in one transaction.
    fn load_seed(
        &mut self,
        graph: Option<GraphSnapshot>,
        history: Vec<SupplementHistoryEntry>,
    ) -> Result<(), SuplementorError> {
        if let Some(snapshot) = &graph {
            validate_snapshot(snapshot)?;
        }
        validate_history_batch(&history)?;

        let encoded_graph = graph.as_ref().map(encode_graph).transpose()?;
        let encoded_history = encode_history(&history)?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        if let Some(encoded) = &encoded_graph {
            write_graph(&write_txn, encoded)?;
        }
        write_history(&write_txn, &encoded_history)?;
        write_txn.commit().map_err(store_err)?;

        for entry in &history {
            self.text_index.insert(entry);
        }
        tracing::info!(
            graph_replaced = encoded_graph.is_some(),
            history = history.len(),
            "loaded seed in one transaction"
        );
        Ok(())
    }
}

// =============================================================================
// WRITE HELPERS
// =============================================================================
//
// Encoding happens before a transaction opens so a serialization failure
// cannot leave half-written tables.

/// A history document and its timeline projection, encoded.
struct EncodedHistory<'a> {
    id: &'a str,
    entry: Vec<u8>,
    timeline: Vec<u8>,
}

/// Encoded nodes and relationships, keyed by id.
struct EncodedGraph<'a> {
    nodes: Vec<(&'a str, Vec<u8>)>,
    relationships: Vec<(&'a str, Vec<u8>)>,
}

fn encode_history(
    entries: &[SupplementHistoryEntry],
) -> Result<Vec<EncodedHistory<'_>>, SuplementorError> {
    entries
        .iter()
        .map(|entry| {
            Ok(EncodedHistory {
                id: entry.id.as_str(),
                entry: encode(entry)?,
                timeline: encode(&entry.to_timeline())?,
            })
        })
        .collect()
}

fn encode_graph(snapshot: &GraphSnapshot) -> Result<EncodedGraph<'_>, SuplementorError> {
    Ok(EncodedGraph {
        nodes: snapshot
            .nodes
            .iter()
            .map(|n| Ok((n.id.as_str(), encode(n)?)))
            .collect::<Result<_, SuplementorError>>()?,
        relationships: snapshot
            .relationships
            .iter()
            .map(|r| Ok((r.id.as_str(), encode(r)?)))
            .collect::<Result<_, SuplementorError>>()?,
    })
}

/// Upsert history documents and their projections.
fn write_history(
    write_txn: &WriteTransaction,
    encoded: &[EncodedHistory<'_>],
) -> Result<(), SuplementorError> {
    let mut history = write_txn.open_table(HISTORY).map_err(store_err)?;
    let mut timeline = write_txn.open_table(HISTORY_TIMELINE).map_err(store_err)?;
    for doc in encoded {
        history
            .insert(doc.id, doc.entry.as_slice())
            .map_err(store_err)?;
        timeline
            .insert(doc.id, doc.timeline.as_slice())
            .map_err(store_err)?;
    }
    Ok(())
}

/// Drop both graph tables and write `graph` in their place.
fn write_graph(write_txn: &WriteTransaction, graph: &EncodedGraph<'_>) -> Result<(), SuplementorError> {
    write_txn.delete_table(NODES).map_err(store_err)?;
    write_txn.delete_table(RELATIONSHIPS).map_err(store_err)?;
    {
        let mut table = write_txn.open_table(NODES).map_err(store_err)?;
        for (id, bytes) in &graph.nodes {
            table.insert(*id, bytes.as_slice()).map_err(store_err)?;
        }
    }
    let mut table = write_txn.open_table(RELATIONSHIPS).map_err(store_err)?;
    for (id, bytes) in &graph.relationships {
        table.insert(*id, bytes.as_slice()).map_err(store_err)?;
    }
    Ok(())
}
