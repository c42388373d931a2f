//! # Validation
//!
//! Schema checks applied before anything reaches a store.
//!
//! Validators never stop at the first problem: a [`Validator`] collects one
//! [`FieldViolation`] per broken field and fails with all of them at once, so
//! callers can report every mistake in a single round trip.

use crate::primitives::{MAX_ID_LENGTH, MAX_NODE_SIZE, MIN_NODE_SIZE};
use crate::types::{
    GraphSnapshot, KnowledgeNode, KnowledgeRelationship, SuplementorError,
    SupplementHistoryEntry,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// VIOLATIONS
// =============================================================================

/// A single broken field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field path in wire naming (`limit`, `nodeTypes[1]`, `relationships[0].sourceId`).
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every violation found while validating one input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True if some violation names exactly `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Accumulates violations for one input.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .violations
            .push(FieldViolation::new(field, message));
    }

    /// Require a non-blank string.
    pub fn non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        }
    }

    /// Require a non-blank identifier within [`MAX_ID_LENGTH`].
    pub fn id(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "must not be empty");
        } else if value.len() > MAX_ID_LENGTH {
            self.push(
                field,
                format!("must be at most {} bytes", MAX_ID_LENGTH),
            );
        }
    }

    /// Resolve an optional integer to a `usize` in `min..=max`, or `default` when absent.
    pub fn bounded(
        &mut self,
        field: &str,
        value: Option<i64>,
        min: usize,
        max: usize,
        default: usize,
    ) -> usize {
        match value {
            None => default,
            Some(v) if v >= min as i64 && v <= max as i64 => v as usize,
            Some(_) => {
                self.push(field, format!("must be between {} and {}", min, max));
                default
            }
        }
    }

    /// Resolve an optional integer to a `usize` no smaller than `min`.
    pub fn at_least(&mut self, field: &str, value: Option<i64>, min: usize, default: usize) -> usize {
        match value {
            None => default,
            Some(v) if v >= min as i64 => v as usize,
            Some(_) => {
                self.push(field, format!("must be at least {}", min));
                default
            }
        }
    }

    /// Require a finite number in `[0, 1]`.
    pub fn unit_interval(&mut self, field: &str, value: f64) {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            self.push(field, "must be a number between 0 and 1");
        }
    }

    /// Parse a closed-enumeration tag.
    pub fn tag<T: FromStr>(&mut self, field: &str, value: &str) -> Option<T>
    where
        T::Err: fmt::Display,
    {
        match value.parse::<T>() {
            Ok(v) => Some(v),
            Err(e) => {
                self.push(field, e.to_string());
                None
            }
        }
    }

    /// Parse an optional list of closed-enumeration tags into a set.
    ///
    /// An absent list is the empty set (no restriction).
    pub fn tag_set<T: FromStr + Ord>(&mut self, field: &str, values: Option<&[String]>) -> BTreeSet<T>
    where
        T::Err: fmt::Display,
    {
        let mut set = BTreeSet::new();
        for (i, raw) in values.unwrap_or_default().iter().enumerate() {
            if let Some(v) = self.tag(&format!("{}[{}]", field, i), raw) {
                set.insert(v);
            }
        }
        set
    }

    /// Finish validation, returning `value` only if nothing was violated.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }

    /// Take the collected violations.
    #[must_use]
    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }
}

// =============================================================================
// INPUT DECODING
// =============================================================================

/// Decode a router input from raw JSON.
///
/// A body that does not decode is checked field by field against the input's
/// default, so every field with a wrongly typed value is reported, not just
/// the first one serde trips over. `null` decodes as the default input.
pub fn decode_input<T>(value: &serde_json::Value) -> Result<T, SuplementorError>
where
    T: DeserializeOwned + Serialize + Default,
{
    use serde_json::Value;

    let fields = match value {
        Value::Null => return Ok(T::default()),
        Value::Object(fields) => fields,
        _ => {
            let mut v = Validator::new();
            v.push("body", "must be a JSON object");
            return Err(v.into_errors().into());
        }
    };
    let whole_error = match T::deserialize(value) {
        Ok(input) => return Ok(input),
        Err(e) => e,
    };

    let Value::Object(baseline) = serde_json::to_value(T::default())
        .map_err(|e| SuplementorError::SerializationError(e.to_string()))?
    else {
        return Err(SuplementorError::SerializationError(
            "router input does not encode as an object".to_string(),
        ));
    };

    let mut v = Validator::new();
    for (key, field_value) in fields {
        let mut single = baseline.clone();
        single.insert(key.clone(), field_value.clone());
        if let Err(e) = T::deserialize(&Value::Object(single)) {
            v.push(key.as_str(), e.to_string());
        }
    }
    if v.errors.is_empty() {
        v.push("body", whole_error.to_string());
    }
    Err(v.into_errors().into())
}

// =============================================================================
// ENTITY VALIDATION
// =============================================================================

fn is_hex_color(color: &str) -> bool {
    let bytes = color.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

fn validate_node_into(v: &mut Validator, prefix: &str, node: &KnowledgeNode) {
    v.id(&format!("{prefix}id"), &node.id);
    v.non_empty(&format!("{prefix}name"), &node.name);
    v.non_empty(&format!("{prefix}polishName"), &node.polish_name);
    v.non_empty(&format!("{prefix}description"), &node.description);
    if !is_hex_color(&node.color) {
        v.push(format!("{prefix}color"), "must be a #RRGGBB hex color");
    }
    if !node.size.is_finite() || !(MIN_NODE_SIZE..=MAX_NODE_SIZE).contains(&node.size) {
        v.push(
            format!("{prefix}size"),
            format!("must be between {} and {}", MIN_NODE_SIZE, MAX_NODE_SIZE),
        );
    }
    if node.importance.is_some_and(|i| !i.is_finite()) {
        v.push(format!("{prefix}importance"), "must be a finite number");
    }
    if node.centrality.is_some_and(|c| !c.is_finite()) {
        v.push(format!("{prefix}centrality"), "must be a finite number");
    }
}

fn validate_relationship_into(v: &mut Validator, prefix: &str, rel: &KnowledgeRelationship) {
    v.id(&format!("{prefix}id"), &rel.id);
    v.id(&format!("{prefix}sourceId"), &rel.source_id);
    v.id(&format!("{prefix}targetId"), &rel.target_id);
    v.unit_interval(&format!("{prefix}strength"), rel.strength);
    v.unit_interval(&format!("{prefix}confidence"), rel.confidence);
    v.non_empty(&format!("{prefix}mechanism"), &rel.mechanism);
}

fn validate_history_into(v: &mut Validator, prefix: &str, entry: &SupplementHistoryEntry) {
    v.id(&format!("{prefix}id"), &entry.id);
    v.non_empty(&format!("{prefix}title"), &entry.title);
    v.non_empty(&format!("{prefix}polishTitle"), &entry.polish_title);
    v.non_empty(&format!("{prefix}era"), &entry.era);
    v.non_empty(&format!("{prefix}description"), &entry.description);
    v.non_empty(&format!("{prefix}polishDescription"), &entry.polish_description);
    if entry.era_start_year > entry.era_end_year {
        v.push(
            format!("{prefix}eraEndYear"),
            "must not be earlier than eraStartYear",
        );
    }
}

/// Validate a single knowledge node.
pub fn validate_node(node: &KnowledgeNode) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    validate_node_into(&mut v, "", node);
    v.finish(())
}

/// Validate a single relationship (field ranges only; endpoints are checked
/// against a snapshot by [`validate_snapshot`]).
pub fn validate_relationship(rel: &KnowledgeRelationship) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    validate_relationship_into(&mut v, "", rel);
    v.finish(())
}

/// Validate a single history entry.
pub fn validate_history_entry(entry: &SupplementHistoryEntry) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    validate_history_into(&mut v, "", entry);
    v.finish(())
}

/// Validate a batch of history entries, including id uniqueness.
pub fn validate_history_batch(entries: &[SupplementHistoryEntry]) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    let mut seen = BTreeSet::new();
    for (i, entry) in entries.iter().enumerate() {
        let prefix = format!("history[{}].", i);
        validate_history_into(&mut v, &prefix, entry);
        if !seen.insert(entry.id.as_str()) {
            v.push(format!("{prefix}id"), format!("duplicate id '{}'", entry.id));
        }
    }
    v.finish(())
}

/// Validate every entity of a snapshot plus its referential integrity.
///
/// Reports duplicate node ids and relationship endpoints that do not resolve
/// to a node of the same snapshot.
pub fn validate_snapshot(snapshot: &GraphSnapshot) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    let mut node_ids = BTreeSet::new();

    for (i, node) in snapshot.nodes.iter().enumerate() {
        let prefix = format!("nodes[{}].", i);
        validate_node_into(&mut v, &prefix, node);
        if !node_ids.insert(node.id.as_str()) {
            v.push(format!("{prefix}id"), format!("duplicate id '{}'", node.id));
        }
    }

    let mut rel_ids = BTreeSet::new();
    for (i, rel) in snapshot.relationships.iter().enumerate() {
        let prefix = format!("relationships[{}].", i);
        validate_relationship_into(&mut v, &prefix, rel);
        if !rel_ids.insert(rel.id.as_str()) {
            v.push(format!("{prefix}id"), format!("duplicate id '{}'", rel.id));
        }
        if !node_ids.contains(rel.source_id.as_str()) {
            v.push(
                format!("{prefix}sourceId"),
                format!("references unknown node '{}'", rel.source_id),
            );
        }
        if !node_ids.contains(rel.target_id.as_str()) {
            v.push(
                format!("{prefix}targetId"),
                format!("references unknown node '{}'", rel.target_id),
            );
        }
    }

    v.finish(())
}
