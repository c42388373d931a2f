//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the crate:
//! - Closed enumerations (`NodeType`, `RelationshipType`, `EvidenceLevel`, `MedicineSystem`, ...)
//! - Entity schemas (`KnowledgeNode`, `KnowledgeRelationship`, `SupplementHistoryEntry`)
//! - The timeline projection (`TimelineEntry`) and graph snapshots
//! - Error types (`SuplementorError`)

mod entities;
mod enums;

pub use entities::{
    GraphSnapshot, HistorySource, KnowledgeNode, KnowledgeRelationship, Position3D, Practitioner,
    SupplementHistoryEntry, TimelineEntry,
};
pub use enums::{
    Difficulty, EvidenceLevel, MedicineSystem, NodeType, RelationshipType, Reversibility,
    UnknownTag,
};

use crate::validation::ValidationErrors;
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Suplementor core.
///
/// - Absence of a single entity is not an error: lookups return `Ok(None)`
/// - Validation failures are reported before any store access
/// - Store failures are surfaced as-is; nothing here retries
#[derive(Debug, Error)]
pub enum SuplementorError {
    /// Malformed or out-of-range input, with every violated field.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The persistence adapter failed (open, transaction, table access).
    #[error("Store error: {0}")]
    StoreError(String),

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred outside the store (seed files, exports).
    #[error("I/O error: {0}")]
    IoError(String),
}

impl SuplementorError {
    /// True for errors caused by the caller's input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<ValidationErrors> for SuplementorError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
