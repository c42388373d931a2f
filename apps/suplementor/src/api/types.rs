//! # API Request/Response Types
//!
//! Request bodies are the core router inputs themselves; this module only
//! defines the envelope every endpoint answers with, plus the two
//! endpoints that have no router behind them.

use serde::{Deserialize, Serialize};
use suplementor_core::{FieldViolation, SuplementorError};

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// Envelope shared by every router endpoint.
///
/// - Success: `success = true`, `data` holds the result (`null` when a
///   single lookup found nothing).
/// - Failure: `success = false`, `error` holds a message and, for
///   validation failures, `violations` lists every broken field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

impl<T> ApiResponse<T> {
    /// Create a success response.
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            violations: Vec::new(),
        }
    }

    /// Create an error response with a message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            violations: Vec::new(),
        }
    }

    /// Convert a core error into the message clients may see.
    ///
    /// Validation failures are echoed in full. Everything else is reduced to
    /// an opaque message; details stay in the server log.
    #[must_use]
    pub fn from_error(err: &SuplementorError) -> Self {
        match err {
            SuplementorError::Validation(errors) => Self {
                success: false,
                data: None,
                error: Some("Invalid input".to_string()),
                violations: errors.violations.clone(),
            },
            _ => Self::error("Internal server error"),
        }
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Content store status response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub history_entries: usize,
    pub nodes: usize,
    pub relationships: usize,
}
