use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Machine-checkable failure category surfaced to callers as `errorType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    EmbeddingError,
    DatabaseUnavailable,
    RpcFunctionMissing,
    PermissionDenied,
    Timeout,
    SupabaseGeneric,
    Unknown,
    GenerationError,
    DecodeError,
    ConfigurationError,
    ValidationError,
    MethodNotAllowed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmbeddingError => "EMBEDDING_ERROR",
            ErrorKind::DatabaseUnavailable => "DATABASE_UNAVAILABLE",
            ErrorKind::RpcFunctionMissing => "RPC_FUNCTION_MISSING",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::SupabaseGeneric => "SUPABASE_GENERIC",
            ErrorKind::Unknown => "UNKNOWN",
            ErrorKind::GenerationError => "GENERATION_ERROR",
            ErrorKind::DecodeError => "DECODE_ERROR",
            ErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        }
    }

    /// Whether a caller could reasonably retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::DatabaseUnavailable | ErrorKind::Timeout | ErrorKind::GenerationError
        )
    }

    /// User-facing message for the `error` field of the envelope.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::EmbeddingError => "We couldn't understand your preferences right now.",
            ErrorKind::DatabaseUnavailable => "The island database is currently unavailable.",
            ErrorKind::RpcFunctionMissing => "The island search is misconfigured.",
            ErrorKind::PermissionDenied => "The island database rejected our credentials.",
            ErrorKind::Timeout => "The island search took too long to respond.",
            ErrorKind::SupabaseGeneric => "The island database returned an error.",
            ErrorKind::Unknown => "Something went wrong while searching for islands.",
            ErrorKind::GenerationError => "Our travel planner couldn't write a recommendation.",
            ErrorKind::DecodeError => "Our travel planner returned an unreadable answer.",
            ErrorKind::ConfigurationError => "Server configuration error.",
            ErrorKind::ValidationError => "Invalid travel preferences.",
            ErrorKind::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// A pipeline stage failed and the failure has already been classified.
    #[error("{kind}: {details}")]
    Pipeline { kind: ErrorKind, details: String },

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidInput(_) => ErrorKind::ValidationError,
            ApiError::Configuration(_) => ErrorKind::ConfigurationError,
            ApiError::MethodNotAllowed(_) => ErrorKind::MethodNotAllowed,
            ApiError::Pipeline { kind, .. } => *kind,
            ApiError::InternalError(_) => ErrorKind::Unknown,
        }
    }

    fn technical_details(&self) -> String {
        match self {
            ApiError::InvalidInput(details)
            | ApiError::Configuration(details)
            | ApiError::MethodNotAllowed(details)
            | ApiError::InternalError(details)
            | ApiError::Pipeline { details, .. } => details.clone(),
        }
    }
}

/// Failure envelope returned for every unsuccessful request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: ErrorKind,
    pub technical_details: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        let kind = err.kind();
        Self {
            error: kind.user_message().to_string(),
            error_type: kind,
            technical_details: err.technical_details(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(self))
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_serializes_screaming_snake() {
        let value = serde_json::to_value(ErrorKind::RpcFunctionMissing).unwrap();
        assert_eq!(value, serde_json::json!("RPC_FUNCTION_MISSING"));
        assert_eq!(ErrorKind::SupabaseGeneric.as_str(), "SUPABASE_GENERIC");
    }

    #[test]
    fn test_envelope_shape() {
        let err = ApiError::Pipeline {
            kind: ErrorKind::DatabaseUnavailable,
            details: "connection refused".to_string(),
        };
        let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap();

        assert_eq!(body["errorType"], "DATABASE_UNAVAILABLE");
        assert_eq!(body["technicalDetails"], "connection refused");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MethodNotAllowed("GET".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::Configuration("missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::DatabaseUnavailable.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::GenerationError.is_transient());
        assert!(!ErrorKind::RpcFunctionMissing.is_transient());
        assert!(!ErrorKind::PermissionDenied.is_transient());
        assert!(!ErrorKind::ValidationError.is_transient());
    }
}
