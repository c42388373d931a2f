//! # suplementor-core
//!
//! The content model and query engine for Suplementor - THE LOGIC.
//!
//! This crate holds everything the supplement education platform knows about
//! its data: the knowledge graph (nodes and relationships), the supplement
//! history timeline, and the read-only procedures that query them.
//!
//! ## Layers
//!
//! - `types` - entity schemas and closed enumerations
//! - `validation` - field-by-field input and entity checks
//! - `store` - persistence contract, in-memory and redb stores, lazy shared handle
//! - `history` / `knowledge` - query routers
//! - `filter` - pure graph filter/projection
//! - `formats` - JSON seed bundles
//!
//! ## Constraints
//!
//! - Routers never write; content arrives through seeding
//! - Has NO async, NO network dependencies (pure Rust)
//! - Logs through `tracing` but never installs a subscriber

// =============================================================================
// MODULES
// =============================================================================

pub mod filter;
pub mod formats;
pub mod history;
pub mod knowledge;
pub mod primitives;
pub mod store;
pub mod text_index;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Difficulty, EvidenceLevel, GraphSnapshot, HistorySource, KnowledgeNode,
    KnowledgeRelationship, MedicineSystem, NodeType, Position3D, Practitioner, RelationshipType,
    Reversibility, SuplementorError, SupplementHistoryEntry, TimelineEntry, UnknownTag,
};
pub use validation::{FieldViolation, ValidationErrors, decode_input};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use store::{
    ContentStore, FindOptions, GraphStore, HistoryFilter, HistorySort, HistoryStore,
    LazyConnection, MemoryStore, RedbStore, SeedLoad, SharedStore,
};
pub use text_index::TextIndex;

// =============================================================================
// RE-EXPORTS: Routers
// =============================================================================

pub use filter::{GraphFilter, GraphFilterInput, GraphView};
pub use history::{
    GetHistoryByIdInput, HistoryRouter, ListByMedicineSystemInput, ListHistoryInput,
    RelatedHistoryInput, SearchHistoryInput, SearchMode, SearchResult, TimelineInput,
};
pub use knowledge::{
    GetGraphInput, GetNodeInput, GraphStatistics, KnowledgeGraph, KnowledgeRouter,
    LearningPath, LearningPathInput, NodeDetails, RelatedNodes, RelatedNodesInput,
    SearchKnowledgeInput,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{SeedBundle, SeedSummary};
