//! # Entity Schemas
//!
//! Wire shape of the three persisted entity kinds. Every bilingual field ships
//! both the base-language and the Polish string, timestamps are ISO-8601 and
//! enumerations are closed.
//!
//! These structs are also the storage encoding (postcard), so they avoid
//! `skip_serializing_if`: optional fields are always written, as `null` in JSON.

use super::enums::{
    EvidenceLevel, MedicineSystem, NodeType, RelationshipType, Reversibility,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// KNOWLEDGE GRAPH
// =============================================================================

/// Layout hint in 3D space, filled in at render time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A node of the knowledge graph (supplement, neurotransmitter, brain region, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeNode {
    /// Stable identifier, unique within a snapshot.
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    pub polish_name: String,
    pub description: String,
    #[serde(default)]
    pub polish_description: Option<String>,
    /// `#RRGGBB`.
    pub color: String,
    pub size: f64,
    #[serde(default)]
    pub position: Option<Position3D>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    pub evidence_level: EvidenceLevel,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Precomputed ranking scalar used when truncating views.
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub centrality: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl KnowledgeNode {
    /// Importance with the "missing counts as zero" rule applied.
    #[must_use]
    pub fn importance_or_zero(&self) -> f64 {
        self.importance.unwrap_or(0.0)
    }

    /// Case-insensitive match of an already lower-cased needle against the
    /// searchable text fields.
    #[must_use]
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        contains_lower(&self.name, needle_lower)
            || contains_lower(&self.polish_name, needle_lower)
            || contains_lower(&self.description, needle_lower)
            || self
                .polish_description
                .as_deref()
                .is_some_and(|d| contains_lower(d, needle_lower))
    }
}

/// A directed, typed edge between two knowledge nodes.
///
/// `source_id` and `target_id` are weak references: nothing in storage
/// guarantees they resolve, so consumers validate them at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeRelationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    /// Design range `[0, 1]`.
    pub strength: f64,
    /// Design range `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub bidirectional: bool,
    pub evidence_level: EvidenceLevel,
    pub mechanism: String,
    #[serde(default)]
    pub polish_mechanism: Option<String>,
    #[serde(default)]
    pub onset: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub reversibility: Option<Reversibility>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl KnowledgeRelationship {
    /// True if either endpoint is `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }

    /// The endpoint on the other side of `node_id`, if this edge touches it.
    #[must_use]
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source_id == node_id {
            Some(&self.target_id)
        } else if self.target_id == node_id {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// The full node + relationship set considered atomically for one filter pass.
///
/// A snapshot is never edited in place; replacing data means replacing the
/// whole snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<KnowledgeNode>,
    #[serde(default)]
    pub relationships: Vec<KnowledgeRelationship>,
}

impl GraphSnapshot {
    #[must_use]
    pub fn new(nodes: Vec<KnowledgeNode>, relationships: Vec<KnowledgeRelationship>) -> Self {
        Self {
            nodes,
            relationships,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

// =============================================================================
// SUPPLEMENT HISTORY
// =============================================================================

/// A person credited in a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Practitioner {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub era: Option<String>,
}

/// A bibliographic source for a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySource {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One event on the supplement history timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementHistoryEntry {
    pub id: String,
    pub title: String,
    pub polish_title: String,
    /// Free-text era label ("Han Dynasty").
    pub era: String,
    /// Negative years are BCE. Always `<= era_end_year`.
    pub era_start_year: i32,
    pub era_end_year: i32,
    pub medicine_system: MedicineSystem,
    #[serde(default)]
    pub geographic_region: Option<String>,
    pub description: String,
    pub polish_description: String,
    #[serde(default)]
    pub key_discoveries: Vec<String>,
    #[serde(default)]
    pub notable_practitioners: Vec<Practitioner>,
    /// Identifiers owned by the supplement catalog; not resolved here.
    #[serde(default)]
    pub related_supplements: Vec<String>,
    #[serde(default)]
    pub cultural_context: Option<String>,
    #[serde(default)]
    pub sources: Vec<HistorySource>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SupplementHistoryEntry {
    /// Case-insensitive substring match of an already lower-cased needle over
    /// titles, descriptions and tags.
    #[must_use]
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        contains_lower(&self.title, needle_lower)
            || contains_lower(&self.polish_title, needle_lower)
            || contains_lower(&self.description, needle_lower)
            || contains_lower(&self.polish_description, needle_lower)
            || self.tags.iter().any(|t| contains_lower(t, needle_lower))
    }

    /// Reduced projection used by the timeline view.
    #[must_use]
    pub fn to_timeline(&self) -> TimelineEntry {
        TimelineEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            polish_title: self.polish_title.clone(),
            era_start_year: self.era_start_year,
            era_end_year: self.era_end_year,
            medicine_system: self.medicine_system,
            tags: self.tags.clone(),
        }
    }
}

/// Timeline projection of a [`SupplementHistoryEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: String,
    pub title: String,
    pub polish_title: String,
    pub era_start_year: i32,
    pub era_end_year: i32,
    pub medicine_system: MedicineSystem,
    pub tags: Vec<String>,
}

fn contains_lower(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn node() -> KnowledgeNode {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        KnowledgeNode {
            id: "magnesium".into(),
            node_type: NodeType::Mineral,
            name: "Magnesium".into(),
            polish_name: "Magnez".into(),
            description: "Cofactor in hundreds of enzymatic reactions".into(),
            polish_description: Some("Kofaktor setek reakcji enzymatycznych".into()),
            color: "#10B981".into(),
            size: 12.0,
            position: None,
            tags: vec!["sleep".into()],
            category: "MINERAL".into(),
            evidence_level: EvidenceLevel::Strong,
            sources: vec![],
            importance: None,
            centrality: None,
            created_at: ts,
            last_updated: ts,
        }
    }

    #[test]
    fn node_text_match_is_case_insensitive_and_covers_polish() {
        let n = node();
        assert!(n.matches_text("magnez"));
        assert!(n.matches_text("enzymat"));
        assert!(n.matches_text("kofaktor"));
        assert!(!n.matches_text("dopamine"));
    }

    #[test]
    fn node_wire_shape_uses_camel_case_and_type_key() {
        let json = serde_json::to_value(node()).unwrap();
        assert_eq!(json["type"], "MINERAL");
        assert_eq!(json["polishName"], "Magnez");
        assert_eq!(json["evidenceLevel"], "STRONG");
        assert_eq!(json["createdAt"], "2025-01-01T00:00:00Z");
        assert!(json["importance"].is_null());
    }

    #[test]
    fn missing_importance_counts_as_zero() {
        assert_eq!(node().importance_or_zero(), 0.0);
    }

    #[test]
    fn relationship_other_end() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let rel = KnowledgeRelationship {
            id: "r1".into(),
            source_id: "a".into(),
            target_id: "b".into(),
            relationship_type: RelationshipType::Enhances,
            strength: 0.5,
            confidence: 0.5,
            bidirectional: false,
            evidence_level: EvidenceLevel::Weak,
            mechanism: "m".into(),
            polish_mechanism: None,
            onset: None,
            duration: None,
            reversibility: None,
            created_at: ts,
            last_updated: ts,
        };
        assert_eq!(rel.other_end("a"), Some("b"));
        assert_eq!(rel.other_end("b"), Some("a"));
        assert_eq!(rel.other_end("c"), None);
        assert!(rel.touches("b"));
    }
}
