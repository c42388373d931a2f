//! # Query Limits
//!
//! Hardcoded bounds and defaults for every router input.
//!
//! All queries must be computationally bounded: every list operation has a
//! hard upper limit, and every traversal has a depth cap.

// =============================================================================
// HISTORY ROUTER
// =============================================================================

/// Default page size for `list_history`.
pub const HISTORY_LIST_DEFAULT_LIMIT: usize = 50;

/// Maximum page size for `list_history`.
pub const HISTORY_LIST_MAX_LIMIT: usize = 100;

/// Default result count for history `search`.
pub const HISTORY_SEARCH_DEFAULT_LIMIT: usize = 20;

/// Maximum result count for history `search`.
pub const HISTORY_SEARCH_MAX_LIMIT: usize = 50;

// =============================================================================
// KNOWLEDGE ROUTER
// =============================================================================

/// Default node cap for `get_graph`.
pub const GRAPH_DEFAULT_MAX_NODES: usize = 100;

/// Maximum node cap for `get_graph`.
pub const GRAPH_MAX_NODES: usize = 500;

/// Default relationship cap for `get_node`.
pub const NODE_DEFAULT_MAX_RELATIONSHIPS: usize = 50;

/// Maximum relationship cap for `get_node`.
pub const NODE_MAX_RELATIONSHIPS: usize = 100;

/// Default depth for `get_related_nodes`.
pub const RELATED_DEFAULT_DEPTH: usize = 1;

/// Maximum depth for `get_related_nodes`.
pub const RELATED_MAX_DEPTH: usize = 3;

/// Default node cap for `get_related_nodes`.
pub const RELATED_DEFAULT_MAX_NODES: usize = 20;

/// Maximum node cap for `get_related_nodes`.
pub const RELATED_MAX_NODES: usize = 100;

/// Default result count for `search_knowledge`.
pub const KNOWLEDGE_SEARCH_DEFAULT_LIMIT: usize = 20;

/// Maximum result count for `search_knowledge`.
pub const KNOWLEDGE_SEARCH_MAX_LIMIT: usize = 50;

/// Default step budget for `get_learning_path`.
pub const LEARNING_PATH_DEFAULT_MAX_STEPS: usize = 10;

/// Maximum step budget for `get_learning_path`.
pub const LEARNING_PATH_MAX_STEPS: usize = 20;

/// Estimated study time per node on a learning path.
pub const MINUTES_PER_PATH_NODE: usize = 15;

// =============================================================================
// ENTITY CONSTRAINTS
// =============================================================================

/// Maximum length of any entity identifier, in bytes.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of a free-text query, in bytes.
pub const MAX_QUERY_LENGTH: usize = 256;

/// Smallest allowed node render size.
pub const MIN_NODE_SIZE: f64 = 1.0;

/// Largest allowed node render size.
pub const MAX_NODE_SIZE: f64 = 50.0;
