//! # Graph Filter / Projection
//!
//! Reduces a [`GraphSnapshot`] to the subset a view should render. Pure and
//! synchronous: the snapshot is borrowed, never modified, and the same filter
//! over the same snapshot always yields the same view.
//!
//! The pass runs in three fixed steps:
//! 1. Nodes are kept by type, evidence level and search term.
//! 2. Relationships are kept when their type passes, their strength is in
//!    range, and both endpoints survived step 1.
//! 3. If more than `max_nodes` nodes remain, the most important are kept and
//!    any relationship touching a dropped node is removed.
//!
//! Every relationship in the output therefore has both endpoints in the
//! output, whatever the store itself guarantees.

use crate::primitives::MAX_QUERY_LENGTH;
use crate::types::{
    EvidenceLevel, GraphSnapshot, KnowledgeNode, KnowledgeRelationship, NodeType,
    RelationshipType,
};
use crate::validation::{ValidationErrors, Validator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// =============================================================================
// FILTER DEFINITION
// =============================================================================

/// A validated filter. Empty sets and `None` bounds do not restrict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphFilter {
    pub node_types: BTreeSet<NodeType>,
    pub relationship_types: BTreeSet<RelationshipType>,
    pub evidence_levels: BTreeSet<EvidenceLevel>,
    /// Case-insensitive substring over name, polishName, description and
    /// polishDescription.
    pub search_term: Option<String>,
    /// Inclusive lower bound on relationship strength.
    pub min_strength: Option<f64>,
    /// Inclusive upper bound on relationship strength.
    pub max_strength: Option<f64>,
    pub max_nodes: Option<usize>,
}

/// Filter as it arrives on the wire, before tags are parsed and bounds checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphFilterInput {
    pub node_types: Option<Vec<String>>,
    pub relationship_types: Option<Vec<String>>,
    pub evidence_levels: Option<Vec<String>>,
    pub search_term: Option<String>,
    pub min_strength: Option<f64>,
    pub max_strength: Option<f64>,
    pub max_nodes: Option<i64>,
}

impl GraphFilterInput {
    /// Parse every tag and check every bound, reporting all violations at once.
    pub fn validate(&self) -> Result<GraphFilter, ValidationErrors> {
        let mut v = Validator::new();
        let node_types = v.tag_set("nodeTypes", self.node_types.as_deref());
        let relationship_types =
            v.tag_set("relationshipTypes", self.relationship_types.as_deref());
        let evidence_levels = v.tag_set("evidenceLevels", self.evidence_levels.as_deref());

        if let Some(min) = self.min_strength {
            v.unit_interval("minStrength", min);
        }
        if let Some(max) = self.max_strength {
            v.unit_interval("maxStrength", max);
        }
        if let (Some(min), Some(max)) = (self.min_strength, self.max_strength) {
            if min > max {
                v.push("maxStrength", "must not be less than minStrength");
            }
        }

        let max_nodes = self
            .max_nodes
            .map(|n| v.at_least("maxNodes", Some(n), 1, 1));

        let search_term = self
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if search_term.as_ref().is_some_and(|t| t.len() > MAX_QUERY_LENGTH) {
            v.push(
                "searchTerm",
                format!("must be at most {} bytes", MAX_QUERY_LENGTH),
            );
        }

        v.finish(GraphFilter {
            node_types,
            relationship_types,
            evidence_levels,
            search_term,
            min_strength: self.min_strength,
            max_strength: self.max_strength,
            max_nodes,
        })
    }
}

// =============================================================================
// VIEW
// =============================================================================

/// The filtered subset of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphView {
    pub nodes: Vec<KnowledgeNode>,
    pub relationships: Vec<KnowledgeRelationship>,
    /// True when `max_nodes` removed at least one node.
    pub truncated: bool,
}

impl GraphFilter {
    /// A filter that only caps the node count.
    #[must_use]
    pub fn max_nodes(max_nodes: usize) -> Self {
        Self {
            max_nodes: Some(max_nodes),
            ..Self::default()
        }
    }

    fn keeps_node(&self, node: &KnowledgeNode, needle: Option<&str>) -> bool {
        (self.node_types.is_empty() || self.node_types.contains(&node.node_type))
            && (self.evidence_levels.is_empty()
                || self.evidence_levels.contains(&node.evidence_level))
            && needle.is_none_or(|n| node.matches_text(n))
    }

    fn keeps_relationship(&self, rel: &KnowledgeRelationship) -> bool {
        (self.relationship_types.is_empty()
            || self.relationship_types.contains(&rel.relationship_type))
            && self.min_strength.is_none_or(|min| rel.strength >= min)
            && self.max_strength.is_none_or(|max| rel.strength <= max)
    }

    /// Project `snapshot` through this filter.
    #[must_use]
    pub fn apply(&self, snapshot: &GraphSnapshot) -> GraphView {
        let needle = self.search_term.as_ref().map(|t| t.to_lowercase());

        // Step 1: nodes.
        let mut nodes: Vec<&KnowledgeNode> = snapshot
            .nodes
            .iter()
            .filter(|n| self.keeps_node(n, needle.as_deref()))
            .collect();

        // Step 3. Truncating before the edge pass yields the same view.
        let truncated = match self.max_nodes {
            Some(max) if nodes.len() > max => {
                nodes.sort_by(|a, b| b.importance_or_zero().total_cmp(&a.importance_or_zero()));
                nodes.truncate(max);
                true
            }
            _ => false,
        };

        // Step 2: relationships with both endpoints in the surviving set.
        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let relationships = snapshot
            .relationships
            .iter()
            .filter(|r| {
                self.keeps_relationship(r)
                    && kept.contains(r.source_id.as_str())
                    && kept.contains(r.target_id.as_str())
            })
            .cloned()
            .collect();

        GraphView {
            nodes: nodes.into_iter().cloned().collect(),
            relationships,
            truncated,
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn node(id: &str, node_type: NodeType, importance: Option<f64>) -> KnowledgeNode {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        KnowledgeNode {
            id: id.into(),
            name: format!("Node {id}"),
            polish_name: format!("Węzeł {id}"),
            node_type,
            description: "test node".into(),
            polish_description: None,
            color: "#10b981".into(),
            size: 10.0,
            position: None,
            tags: vec![],
            category: "test".into(),
            evidence_level: EvidenceLevel::Moderate,
            sources: vec![],
            importance,
            centrality: None,
            created_at: at,
            last_updated: at,
        }
    }

    fn rel(id: &str, source: &str, target: &str, strength: f64) -> KnowledgeRelationship {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        KnowledgeRelationship {
            id: id.into(),
            source_id: source.into(),
            target_id: target.into(),
            relationship_type: RelationshipType::Enhances,
            strength,
            confidence: 0.7,
            bidirectional: false,
            evidence_level: EvidenceLevel::Moderate,
            mechanism: "test".into(),
            polish_mechanism: None,
            onset: None,
            duration: None,
            reversibility: None,
            created_at: at,
            last_updated: at,
        }
    }

    fn ids(view: &GraphView) -> Vec<&str> {
        view.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn truncation_drops_relationships_to_removed_nodes() {
        let snapshot = GraphSnapshot::new(
            vec![
                node("A", NodeType::Supplement, Some(5.0)),
                node("B", NodeType::BrainRegion, Some(9.0)),
            ],
            vec![rel("r1", "A", "B", 0.8)],
        );
        let view = GraphFilter::max_nodes(1).apply(&snapshot);
        assert_eq!(ids(&view), vec!["B"]);
        assert!(view.relationships.is_empty());
        assert!(view.truncated);
    }

    #[test]
    fn untruncated_view_keeps_snapshot_order() {
        let snapshot = GraphSnapshot::new(
            vec![
                node("A", NodeType::Supplement, Some(1.0)),
                node("B", NodeType::Supplement, Some(9.0)),
            ],
            vec![],
        );
        let view = GraphFilter::max_nodes(5).apply(&snapshot);
        assert_eq!(ids(&view), vec!["A", "B"]);
        assert!(!view.truncated);
    }

    #[test]
    fn importance_ties_keep_insertion_order() {
        let snapshot = GraphSnapshot::new(
            vec![
                node("first", NodeType::Supplement, Some(3.0)),
                node("missing", NodeType::Supplement, None),
                node("second", NodeType::Supplement, Some(3.0)),
                node("third", NodeType::Supplement, Some(3.0)),
            ],
            vec![],
        );
        let view = GraphFilter::max_nodes(2).apply(&snapshot);
        assert_eq!(ids(&view), vec!["first", "second"]);
    }

    #[test]
    fn type_filter_removes_edges_to_filtered_nodes() {
        let snapshot = GraphSnapshot::new(
            vec![
                node("bacopa", NodeType::Supplement, None),
                node("hippocampus", NodeType::BrainRegion, None),
                node("memory", NodeType::CognitiveFunction, None),
            ],
            vec![
                rel("r1", "bacopa", "hippocampus", 0.6),
                rel("r2", "bacopa", "memory", 0.9),
            ],
        );
        let filter = GraphFilter {
            node_types: [NodeType::Supplement, NodeType::CognitiveFunction].into(),
            ..GraphFilter::default()
        };
        let view = filter.apply(&snapshot);
        assert_eq!(ids(&view), vec!["bacopa", "memory"]);
        assert_eq!(view.relationships.len(), 1);
        assert_eq!(view.relationships[0].id, "r2");
    }

    #[test]
    fn strength_bounds_are_inclusive() {
        let snapshot = GraphSnapshot::new(
            vec![
                node("a", NodeType::Supplement, None),
                node("b", NodeType::Supplement, None),
            ],
            vec![
                rel("weak", "a", "b", 0.2),
                rel("edge", "a", "b", 0.5),
                rel("strong", "a", "b", 0.9),
            ],
        );
        let filter = GraphFilter {
            min_strength: Some(0.5),
            max_strength: Some(0.8),
            ..GraphFilter::default()
        };
        let view = filter.apply(&snapshot);
        let rels: Vec<&str> = view.relationships.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rels, vec!["edge"]);
        assert_eq!(view.nodes.len(), 2);
    }

    #[test]
    fn search_term_is_case_insensitive_and_covers_polish_fields() {
        let mut lion = node("lions-mane", NodeType::Supplement, None);
        lion.polish_description = Some("Grzyb wspierający NGF".into());
        let snapshot = GraphSnapshot::new(
            vec![lion, node("other", NodeType::Supplement, None)],
            vec![],
        );
        let filter = GraphFilter {
            search_term: Some("GRZYB".into()),
            ..GraphFilter::default()
        };
        assert_eq!(ids(&filter.apply(&snapshot)), vec!["lions-mane"]);
    }

    #[test]
    fn applying_twice_is_identical() {
        let snapshot = GraphSnapshot::new(
            vec![
                node("a", NodeType::Supplement, Some(2.0)),
                node("b", NodeType::Pathway, Some(2.0)),
                node("c", NodeType::Mechanism, Some(7.0)),
            ],
            vec![rel("r", "a", "c", 0.4)],
        );
        let filter = GraphFilter::max_nodes(2);
        assert_eq!(filter.apply(&snapshot), filter.apply(&snapshot));
    }

    #[test]
    fn input_validation_reports_every_field() {
        let input = GraphFilterInput {
            node_types: Some(vec!["SUPPLEMENT".into(), "PLANET".into()]),
            evidence_levels: Some(vec!["ANECDOTAL".into()]),
            min_strength: Some(0.9),
            max_strength: Some(0.1),
            max_nodes: Some(0),
            ..GraphFilterInput::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.has_field("nodeTypes[1]"));
        assert!(errors.has_field("evidenceLevels[0]"));
        assert!(errors.has_field("maxStrength"));
        assert!(errors.has_field("maxNodes"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn blank_search_term_is_dropped() {
        let input = GraphFilterInput {
            search_term: Some("   ".into()),
            relationship_types: Some(vec!["SYNERGIZES".into()]),
            ..GraphFilterInput::default()
        };
        let filter = input.validate().unwrap();
        assert!(filter.search_term.is_none());
        assert!(filter.relationship_types.contains(&RelationshipType::Synergizes));
    }
}
