//! Error types shared by the core transformations
//!
//! Every failure in the editor workflow is scoped to a single action. None of
//! these types carry I/O errors; the shell converts transport failures into
//! [`ErrorKind`] before handing them back to the core.

use serde::{Deserialize, Serialize};

/// Input rejected before anything is sent to the backend
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A prompt is required to generate code")]
    MissingPrompt,

    #[error("A target language is required to convert code")]
    MissingTargetLanguage,

    #[error("Target language must differ from the source language ({0})")]
    SameLanguage(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
}

/// Session-level rejections
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("An AI request is already in flight (#{0}); wait for it to finish")]
    Busy(u64),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure carried inside an AI result
///
/// Displayed verbatim to the user; never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("Request failed: {message}")]
    Network { message: String },

    #[error("Backend returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected response from the AI service: missing `{field}`")]
    MalformedResponse { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_message_is_verbatim() {
        let err = ErrorKind::Backend {
            status: 400,
            message: "Prompt is required".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend returned HTTP 400: Prompt is required"
        );
    }

    #[test]
    fn test_session_error_wraps_validation() {
        let err: SessionError = ValidationError::MissingPrompt.into();
        assert_eq!(err.to_string(), "A prompt is required to generate code");
    }

    #[test]
    fn test_error_kind_serializes_with_tag() {
        let err = ErrorKind::MalformedResponse {
            field: "explanation".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "malformed_response");
        assert_eq!(json["field"], "explanation");
    }
}
