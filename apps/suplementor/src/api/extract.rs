//! # Request Body Extraction
//!
//! [`RouterInput`] replaces axum's `Json` extractor for router inputs. Bodies
//! are read as raw JSON first and then decoded by the core, so wrongly typed
//! fields come back as a 400 envelope listing every bad field instead of
//! axum's plain-text rejection.

use super::types::ApiResponse;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use suplementor_core::{FieldViolation, SuplementorError, ValidationErrors, decode_input};

/// A router input decoded from the JSON request body.
#[derive(Debug, Clone)]
pub struct RouterInput<T>(pub T);

impl<S, T> FromRequest<S> for RouterInput<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Serialize + Default + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| body_rejection(&rejection))?;

        decode_input(&value).map(Self).map_err(|e| {
            tracing::debug!(error = %e, "undecodable request body");
            (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::from_error(&e))).into_response()
        })
    }
}

/// Syntax errors become a validation envelope on `body`; everything else
/// (missing content type, oversized body) keeps axum's status code.
fn body_rejection(rejection: &JsonRejection) -> Response {
    let status = rejection.status();
    let body = if status == StatusCode::BAD_REQUEST {
        ApiResponse::<()>::from_error(&SuplementorError::Validation(ValidationErrors {
            violations: vec![FieldViolation::new("body", rejection.body_text())],
        }))
    } else {
        ApiResponse::<()>::error(rejection.body_text())
    };
    (status, Json(body)).into_response()
}
