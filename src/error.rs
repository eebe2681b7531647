//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use crate::dip::{DipId, DipStatus, ValidationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Structural problems found while reading a DIP document.
///
/// Line numbers are 1-based and point into the source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("document has no top-level '# Title' heading")]
    MissingTitle,

    #[error("line {line}: no metadata table found after the title")]
    MissingMetadataTable { line: usize },

    #[error("line {line}: malformed metadata row '{content}'")]
    MalformedRow { line: usize, content: String },

    #[error("line {line}: metadata table is missing required field '{field}'")]
    MissingField { field: &'static str, line: usize },

    #[error("line {line}: field '{field}' appears more than once")]
    DuplicateField { field: String, line: usize },

    #[error("line {line}: invalid value '{value}' for field '{field}'")]
    InvalidField {
        field: &'static str,
        value: String,
        line: usize,
    },
}

impl ParseError {
    /// Source line the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::MissingTitle => None,
            ParseError::MissingMetadataTable { line }
            | ParseError::MalformedRow { line, .. }
            | ParseError::MissingField { line, .. }
            | ParseError::DuplicateField { line, .. }
            | ParseError::InvalidField { line, .. } => Some(*line),
        }
    }
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Document failed validation with {} violation(s)", .0.len())]
    Invalid(Vec<ValidationError>),

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: DipStatus, to: DipStatus },

    #[error("DIP {0} is already registered")]
    DuplicateId(DipId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<ValidationError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut line = None;
        let mut violations = None;

        let (status, error_code, message, details) = match self {
            AppError::Parse(e) => {
                line = e.line();
                (
                    StatusCode::BAD_REQUEST,
                    "PARSE_ERROR",
                    "The document could not be parsed".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Invalid(found) => {
                let message = format!("The document has {} validation violation(s)", found.len());
                violations = Some(found);
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED", message, None)
            }
            AppError::IllegalTransition { from, to } => (
                StatusCode::CONFLICT,
                "ILLEGAL_TRANSITION",
                format!("Cannot move a DIP from {} to {}", from, to),
                None,
            ),
            AppError::DuplicateId(id) => (
                StatusCode::CONFLICT,
                "DUPLICATE_ID",
                format!("DIP {} is already registered", id),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::Io(e) => {
                error!("I/O error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "An I/O error occurred".to_string(),
                    Some(e.to_string()),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
            line,
            violations,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a not found error for a DIP id
pub fn dip_not_found(id: DipId) -> AppError {
    AppError::NotFound(format!("DIP {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_line() {
        let err = ParseError::MalformedRow {
            line: 7,
            content: "| a | b | c |".to_string(),
        };
        assert_eq!(err.line(), Some(7));
        assert_eq!(ParseError::MissingTitle.line(), None);
        assert!(err.to_string().starts_with("line 7:"));
    }

    #[test]
    fn test_illegal_transition_names_both_states() {
        let err = AppError::IllegalTransition {
            from: DipStatus::Draft,
            to: DipStatus::Accepted,
        };
        let msg = err.to_string();
        assert!(msg.contains("Draft"));
        assert!(msg.contains("Accepted"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::DuplicateId(1019).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(dip_not_found(1).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Invalid(vec![]).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(ParseError::MissingTitle).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(std::io::Error::from(std::io::ErrorKind::NotFound))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
