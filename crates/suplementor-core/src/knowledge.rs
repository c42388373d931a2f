//! # Knowledge Router
//!
//! Read-only procedures over the knowledge graph:
//! - `get_graph`: filtered, importance-ordered subgraph, optionally centred on a node
//! - `get_node`: one node with its strongest relationships
//! - `get_related_nodes`: undirected breadth-first neighbourhood
//! - `search_knowledge`: literal text search over nodes
//! - `get_learning_path`: shortest undirected path between two nodes
//! - `get_statistics`: counts per type and evidence level
//! - `filter_graph`: the filter/projection layer over the stored snapshot
//!
//! Like the history router, inputs are validated in full before the store is
//! read, and absence of a single node is `Ok(None)`.

use crate::filter::{GraphFilterInput, GraphView};
use crate::primitives::{
    GRAPH_DEFAULT_MAX_NODES, GRAPH_MAX_NODES, KNOWLEDGE_SEARCH_DEFAULT_LIMIT,
    KNOWLEDGE_SEARCH_MAX_LIMIT, LEARNING_PATH_DEFAULT_MAX_STEPS, LEARNING_PATH_MAX_STEPS,
    MAX_QUERY_LENGTH, MINUTES_PER_PATH_NODE, NODE_DEFAULT_MAX_RELATIONSHIPS,
    NODE_MAX_RELATIONSHIPS, RELATED_DEFAULT_DEPTH, RELATED_DEFAULT_MAX_NODES, RELATED_MAX_DEPTH,
    RELATED_MAX_NODES,
};
use crate::store::GraphStore;
use crate::types::{
    Difficulty, EvidenceLevel, KnowledgeNode, KnowledgeRelationship, NodeType,
    RelationshipType, SuplementorError,
};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

// =============================================================================
// INPUTS
// =============================================================================

/// `getGraph` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetGraphInput {
    pub node_types: Option<Vec<String>>,
    pub relationship_types: Option<Vec<String>>,
    pub evidence_levels: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub max_nodes: Option<i64>,
    pub center_node_id: Option<String>,
}

/// `getNode` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetNodeInput {
    pub id: String,
    pub include_relationships: Option<bool>,
    pub max_relationships: Option<i64>,
}

/// `getRelatedNodes` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelatedNodesInput {
    pub node_id: String,
    pub depth: Option<i64>,
    pub relationship_types: Option<Vec<String>>,
    pub node_types: Option<Vec<String>>,
    pub max_nodes: Option<i64>,
}

/// `searchKnowledge` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchKnowledgeInput {
    pub query: String,
    pub node_types: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub evidence_levels: Option<Vec<String>>,
    pub limit: Option<i64>,
}

/// `getLearningPath` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningPathInput {
    pub start_node_id: String,
    pub end_node_id: String,
    pub difficulty: Option<String>,
    pub max_steps: Option<i64>,
}

// =============================================================================
// OUTPUTS
// =============================================================================

/// Result of `get_graph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraph {
    pub nodes: Vec<KnowledgeNode>,
    pub relationships: Vec<KnowledgeRelationship>,
    pub total_nodes: usize,
    pub total_relationships: usize,
}

/// Result of `get_node`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    #[serde(flatten)]
    pub node: KnowledgeNode,
    /// Relationships starting at this node, strongest first.
    pub source_relationships: Vec<KnowledgeRelationship>,
    /// Relationships ending at this node, strongest first.
    pub target_relationships: Vec<KnowledgeRelationship>,
}

/// Result of `get_related_nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedNodes {
    /// The centre first, then neighbours in discovery order.
    pub nodes: Vec<KnowledgeNode>,
    pub depth: usize,
    pub total_found: usize,
    pub center_node_id: String,
}

/// Result of `get_learning_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub path: Vec<KnowledgeNode>,
    pub path_length: usize,
    pub difficulty: Difficulty,
    /// Minutes, at a fixed rate per node.
    pub estimated_time: usize,
    pub found: bool,
}

/// One bucket of a type histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount<T> {
    #[serde(rename = "type")]
    pub kind: T,
    pub count: usize,
}

/// One bucket of the evidence-level histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: EvidenceLevel,
    pub count: usize,
}

/// Result of `get_statistics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_relationships: usize,
    pub nodes_by_type: Vec<TypeCount<NodeType>>,
    pub relationships_by_type: Vec<TypeCount<RelationshipType>>,
    pub evidence_level_distribution: Vec<LevelCount>,
}

// =============================================================================
// ORDERING HELPERS
// =============================================================================

/// Importance desc, centrality desc, name asc. Missing scores count as zero.
fn by_prominence(a: &KnowledgeNode, b: &KnowledgeNode) -> Ordering {
    b.importance_or_zero()
        .total_cmp(&a.importance_or_zero())
        .then_with(|| {
            b.centrality
                .unwrap_or(0.0)
                .total_cmp(&a.centrality.unwrap_or(0.0))
        })
        .then_with(|| a.name.cmp(&b.name))
}

/// Importance desc, evidence rank desc, name asc.
fn by_relevance(a: &KnowledgeNode, b: &KnowledgeNode) -> Ordering {
    b.importance_or_zero()
        .total_cmp(&a.importance_or_zero())
        .then_with(|| b.evidence_level.rank().cmp(&a.evidence_level.rank()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Undirected adjacency over the relationships whose type passes `types`.
fn adjacency<'r>(
    relationships: &'r [KnowledgeRelationship],
    types: &BTreeSet<RelationshipType>,
) -> BTreeMap<&'r str, Vec<&'r str>> {
    let mut adj: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for rel in relationships
        .iter()
        .filter(|r| types.is_empty() || types.contains(&r.relationship_type))
    {
        adj.entry(rel.source_id.as_str())
            .or_default()
            .push(rel.target_id.as_str());
        adj.entry(rel.target_id.as_str())
            .or_default()
            .push(rel.source_id.as_str());
    }
    adj
}

fn string_set(values: Option<&[String]>) -> BTreeSet<&str> {
    values
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect()
}

// =============================================================================
// ROUTER
// =============================================================================

/// Knowledge-graph procedures bound to a store.
pub struct KnowledgeRouter<'a, S: GraphStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> KnowledgeRouter<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Filtered subgraph, most prominent nodes first.
    ///
    /// With a centre node, only the centre and its direct neighbours (over
    /// relationships of an allowed type) are candidates; the cap applies after.
    pub fn get_graph(&self, input: &GetGraphInput) -> Result<KnowledgeGraph, SuplementorError> {
        let mut v = Validator::new();
        let node_types: BTreeSet<NodeType> = v.tag_set("nodeTypes", input.node_types.as_deref());
        let relationship_types: BTreeSet<RelationshipType> =
            v.tag_set("relationshipTypes", input.relationship_types.as_deref());
        let evidence_levels: BTreeSet<EvidenceLevel> =
            v.tag_set("evidenceLevels", input.evidence_levels.as_deref());
        let max_nodes = v.bounded(
            "maxNodes",
            input.max_nodes,
            1,
            GRAPH_MAX_NODES,
            GRAPH_DEFAULT_MAX_NODES,
        );
        if let Some(center) = &input.center_node_id {
            v.id("centerNodeId", center);
        }
        v.finish(())?;

        let categories = string_set(input.categories.as_deref());
        let tags = string_set(input.tags.as_deref());
        let relationships = self.store.relationships()?;

        let neighbourhood: Option<HashSet<&str>> = input.center_node_id.as_deref().map(|center| {
            relationships
                .iter()
                .filter(|r| {
                    r.touches(center)
                        && (relationship_types.is_empty()
                            || relationship_types.contains(&r.relationship_type))
                })
                .filter_map(|r| r.other_end(center))
                .chain(std::iter::once(center))
                .collect()
        });

        let mut nodes: Vec<KnowledgeNode> = self
            .store
            .nodes()?
            .into_iter()
            .filter(|n| {
                (node_types.is_empty() || node_types.contains(&n.node_type))
                    && (evidence_levels.is_empty() || evidence_levels.contains(&n.evidence_level))
                    && (categories.is_empty() || categories.contains(n.category.as_str()))
                    && (tags.is_empty() || n.tags.iter().any(|t| tags.contains(t.as_str())))
                    && neighbourhood
                        .as_ref()
                        .is_none_or(|ids| ids.contains(n.id.as_str()))
            })
            .collect();
        nodes.sort_by(by_prominence);
        nodes.truncate(max_nodes);

        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let relationships: Vec<KnowledgeRelationship> = relationships
            .iter()
            .filter(|r| {
                kept.contains(r.source_id.as_str())
                    && kept.contains(r.target_id.as_str())
                    && (relationship_types.is_empty()
                        || relationship_types.contains(&r.relationship_type))
            })
            .cloned()
            .collect();

        Ok(KnowledgeGraph {
            total_nodes: nodes.len(),
            total_relationships: relationships.len(),
            nodes,
            relationships,
        })
    }

    /// One node with up to `maxRelationships` of its strongest relationships.
    pub fn get_node(&self, input: &GetNodeInput) -> Result<Option<NodeDetails>, SuplementorError> {
        let mut v = Validator::new();
        v.id("id", &input.id);
        let max_relationships = v.bounded(
            "maxRelationships",
            input.max_relationships,
            1,
            NODE_MAX_RELATIONSHIPS,
            NODE_DEFAULT_MAX_RELATIONSHIPS,
        );
        v.finish(())?;

        let Some(node) = self.store.node(&input.id)? else {
            return Ok(None);
        };

        let (mut source_relationships, mut target_relationships) = (Vec::new(), Vec::new());
        if input.include_relationships.unwrap_or(true) {
            let mut rels = self.store.relationships_of(&input.id)?;
            rels.sort_by(|a, b| b.strength.total_cmp(&a.strength));
            rels.truncate(max_relationships);
            for rel in rels {
                if rel.source_id == input.id {
                    source_relationships.push(rel);
                } else {
                    target_relationships.push(rel);
                }
            }
        }

        Ok(Some(NodeDetails {
            node,
            source_relationships,
            target_relationships,
        }))
    }

    /// Nodes within `depth` undirected hops of `nodeId`.
    ///
    /// Expansion stops after the level at which `maxNodes` ids (centre
    /// included) have been seen. The node-type filter applies to the result,
    /// not to traversal. `None` when the centre node does not exist.
    pub fn get_related_nodes(
        &self,
        input: &RelatedNodesInput,
    ) -> Result<Option<RelatedNodes>, SuplementorError> {
        let mut v = Validator::new();
        v.id("nodeId", &input.node_id);
        let depth = v.bounded("depth", input.depth, 1, RELATED_MAX_DEPTH, RELATED_DEFAULT_DEPTH);
        let relationship_types: BTreeSet<RelationshipType> =
            v.tag_set("relationshipTypes", input.relationship_types.as_deref());
        let node_types: BTreeSet<NodeType> = v.tag_set("nodeTypes", input.node_types.as_deref());
        let max_nodes = v.bounded(
            "maxNodes",
            input.max_nodes,
            1,
            RELATED_MAX_NODES,
            RELATED_DEFAULT_MAX_NODES,
        );
        v.finish(())?;

        if self.store.node(&input.node_id)?.is_none() {
            return Ok(None);
        }

        let relationships = self.store.relationships()?;
        let adj = adjacency(&relationships, &relationship_types);

        let mut seen: Vec<&str> = vec![input.node_id.as_str()];
        let mut visited: HashSet<&str> = seen.iter().copied().collect();
        let mut frontier: Vec<&str> = seen.clone();
        for _ in 0..depth {
            let mut next = Vec::new();
            for id in &frontier {
                for &neighbour in adj.get(id).into_iter().flatten() {
                    if visited.insert(neighbour) {
                        next.push(neighbour);
                    }
                }
            }
            seen.extend(next.iter().copied());
            frontier = next;
            if seen.len() >= max_nodes || frontier.is_empty() {
                break;
            }
        }

        let mut nodes = Vec::new();
        for id in seen {
            if nodes.len() == max_nodes {
                break;
            }
            if let Some(node) = self.store.node(id)? {
                if node_types.is_empty() || node_types.contains(&node.node_type) {
                    nodes.push(node);
                }
            }
        }

        Ok(Some(RelatedNodes {
            total_found: nodes.len(),
            nodes,
            depth,
            center_node_id: input.node_id.clone(),
        }))
    }

    /// Nodes whose text contains `query` (case-insensitive) or that carry it
    /// as an exact tag.
    pub fn search_knowledge(
        &self,
        input: &SearchKnowledgeInput,
    ) -> Result<Vec<KnowledgeNode>, SuplementorError> {
        let mut v = Validator::new();
        let query = input.query.trim();
        v.non_empty("query", query);
        if query.len() > MAX_QUERY_LENGTH {
            v.push("query", format!("must be at most {} bytes", MAX_QUERY_LENGTH));
        }
        let node_types: BTreeSet<NodeType> = v.tag_set("nodeTypes", input.node_types.as_deref());
        let evidence_levels: BTreeSet<EvidenceLevel> =
            v.tag_set("evidenceLevels", input.evidence_levels.as_deref());
        let limit = v.bounded(
            "limit",
            input.limit,
            1,
            KNOWLEDGE_SEARCH_MAX_LIMIT,
            KNOWLEDGE_SEARCH_DEFAULT_LIMIT,
        );
        v.finish(())?;

        let categories = string_set(input.categories.as_deref());
        let needle = query.to_lowercase();

        let mut hits: Vec<KnowledgeNode> = self
            .store
            .nodes()?
            .into_iter()
            .filter(|n| {
                (n.matches_text(&needle) || n.tags.iter().any(|t| t == query))
                    && (node_types.is_empty() || node_types.contains(&n.node_type))
                    && (categories.is_empty() || categories.contains(n.category.as_str()))
                    && (evidence_levels.is_empty() || evidence_levels.contains(&n.evidence_level))
            })
            .collect();
        hits.sort_by(by_relevance);
        hits.truncate(limit);
        Ok(hits)
    }

    /// Shortest undirected path from start to end with at most `maxSteps` nodes.
    pub fn get_learning_path(
        &self,
        input: &LearningPathInput,
    ) -> Result<LearningPath, SuplementorError> {
        let mut v = Validator::new();
        v.id("startNodeId", &input.start_node_id);
        v.id("endNodeId", &input.end_node_id);
        let difficulty = input
            .difficulty
            .as_deref()
            .and_then(|d| v.tag::<Difficulty>("difficulty", d))
            .unwrap_or_default();
        let max_steps = v.bounded(
            "maxSteps",
            input.max_steps,
            1,
            LEARNING_PATH_MAX_STEPS,
            LEARNING_PATH_DEFAULT_MAX_STEPS,
        );
        v.finish(())?;

        let not_found = LearningPath {
            path: Vec::new(),
            path_length: 0,
            difficulty,
            estimated_time: 0,
            found: false,
        };

        let start = input.start_node_id.as_str();
        let end = input.end_node_id.as_str();
        if self.store.node(start)?.is_none() {
            return Ok(not_found);
        }

        let relationships = self.store.relationships()?;
        let adj = adjacency(&relationships, &BTreeSet::new());

        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut visited: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start, 1)]);
        let mut reached = false;
        while let Some((id, len)) = queue.pop_front() {
            if id == end {
                reached = true;
                break;
            }
            if len == max_steps {
                continue;
            }
            for &next in adj.get(id).into_iter().flatten() {
                if visited.insert(next) {
                    parent.insert(next, id);
                    queue.push_back((next, len + 1));
                }
            }
        }
        if !reached {
            return Ok(not_found);
        }

        let mut ids = vec![end];
        let mut cursor = end;
        while let Some(&prev) = parent.get(cursor) {
            ids.push(prev);
            cursor = prev;
        }
        ids.reverse();

        let mut path = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.node(id)? {
                Some(node) => path.push(node),
                // A dangling endpoint breaks the path.
                None => return Ok(not_found),
            }
        }

        Ok(LearningPath {
            path_length: path.len(),
            estimated_time: path.len() * MINUTES_PER_PATH_NODE,
            path,
            difficulty,
            found: true,
        })
    }

    /// Totals and histograms, in enumeration order, zero buckets omitted.
    pub fn get_statistics(&self) -> Result<GraphStatistics, SuplementorError> {
        let nodes = self.store.nodes()?;
        let relationships = self.store.relationships()?;

        let mut node_types: BTreeMap<NodeType, usize> = BTreeMap::new();
        let mut levels: BTreeMap<EvidenceLevel, usize> = BTreeMap::new();
        for node in &nodes {
            *node_types.entry(node.node_type).or_insert(0) += 1;
            *levels.entry(node.evidence_level).or_insert(0) += 1;
        }
        let mut rel_types: BTreeMap<RelationshipType, usize> = BTreeMap::new();
        for rel in &relationships {
            *rel_types.entry(rel.relationship_type).or_insert(0) += 1;
        }

        Ok(GraphStatistics {
            total_nodes: nodes.len(),
            total_relationships: relationships.len(),
            nodes_by_type: node_types
                .into_iter()
                .map(|(kind, count)| TypeCount { kind, count })
                .collect(),
            relationships_by_type: rel_types
                .into_iter()
                .map(|(kind, count)| TypeCount { kind, count })
                .collect(),
            evidence_level_distribution: levels
                .into_iter()
                .map(|(level, count)| LevelCount { level, count })
                .collect(),
        })
    }

    /// Apply the filter/projection layer to the stored snapshot.
    pub fn filter_graph(&self, input: &GraphFilterInput) -> Result<GraphView, SuplementorError> {
        let filter = input.validate()?;
        let snapshot = self.store.snapshot()?;
        Ok(filter.apply(&snapshot))
    }
}
