//! Maps raw stage failures onto the user-facing [`ErrorKind`] taxonomy.
//!
//! Retrieval failures are classified heuristically from status codes,
//! PostgREST/PostgreSQL error codes and message substrings. Provider message
//! formats drift, so treat the result as a best-effort hint: anything that
//! doesn't match a known pattern falls back to a generic kind.

use crate::error::{ApiError, ErrorKind};
use crate::ml::{EmbeddingError, GenerationError};
use crate::services::decoder::DecodeError;
use crate::services::supabase::StoreError;
use thiserror::Error;

/// A failure raised by exactly one pipeline stage, not yet classified.
#[derive(Error, Debug)]
pub enum PipelineFailure {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Retrieval(#[from] StoreError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl From<PipelineFailure> for ApiError {
    fn from(failure: PipelineFailure) -> Self {
        ApiError::Pipeline {
            kind: classify(&failure),
            details: failure.to_string(),
        }
    }
}

const TIMEOUT_CODES: &[&str] = &["57014"];
const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out", "statement canceled"];

const UNAVAILABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "econnrefused",
    "failed to connect",
    "error trying to connect",
    "connection reset",
    "dns error",
    "failed to lookup address",
    "network",
    "service unavailable",
];

const MISSING_FUNCTION_CODES: &[&str] = &["PGRST202", "42883"];
const MISSING_FUNCTION_PATTERNS: &[&str] = &[
    "could not find the function",
    "function does not exist",
    "schema cache",
];

const PERMISSION_CODES: &[&str] = &["42501", "PGRST301", "PGRST302"];
const PERMISSION_PATTERNS: &[&str] = &[
    "permission denied",
    "jwt",
    "invalid api key",
    "no api key",
    "unauthorized",
];

pub fn classify(failure: &PipelineFailure) -> ErrorKind {
    match failure {
        PipelineFailure::Embedding(_) => ErrorKind::EmbeddingError,
        PipelineFailure::Retrieval(err) => classify_store_error(err),
        PipelineFailure::Generation(_) => ErrorKind::GenerationError,
        PipelineFailure::Decode(_) => ErrorKind::DecodeError,
    }
}

fn classify_store_error(err: &StoreError) -> ErrorKind {
    let message = err.to_string().to_lowercase();
    let contains_any = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));

    let (code, status) = match err {
        StoreError::Transport {
            timeout: true,
            ..
        } => return ErrorKind::Timeout,
        StoreError::Transport { connect: true, .. } => return ErrorKind::DatabaseUnavailable,
        StoreError::Transport { .. } => (None, None),
        StoreError::Api { status, body } => (body.code.as_deref(), Some(*status)),
        StoreError::MalformedResponse(_) => (None, None),
    };
    let has_code = |codes: &[&str]| code.is_some_and(|c| codes.contains(&c));

    if has_code(TIMEOUT_CODES) || status == Some(408) || contains_any(TIMEOUT_PATTERNS) {
        return ErrorKind::Timeout;
    }
    if matches!(status, Some(502..=504)) || contains_any(UNAVAILABLE_PATTERNS) {
        return ErrorKind::DatabaseUnavailable;
    }
    if has_code(MISSING_FUNCTION_CODES)
        || contains_any(MISSING_FUNCTION_PATTERNS)
        || (message.contains("function") && message.contains("does not exist"))
    {
        return ErrorKind::RpcFunctionMissing;
    }
    if has_code(PERMISSION_CODES)
        || matches!(status, Some(401) | Some(403))
        || contains_any(PERMISSION_PATTERNS)
    {
        return ErrorKind::PermissionDenied;
    }
    if code.is_some() || status.is_some() || matches!(err, StoreError::MalformedResponse(_)) {
        return ErrorKind::SupabaseGeneric;
    }

    ErrorKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::supabase::PostgrestError;

    fn transport(message: &str, timeout: bool, connect: bool) -> PipelineFailure {
        PipelineFailure::Retrieval(StoreError::Transport {
            message: message.to_string(),
            timeout,
            connect,
        })
    }

    fn api(status: u16, code: Option<&str>, message: &str) -> PipelineFailure {
        PipelineFailure::Retrieval(StoreError::Api {
            status,
            body: PostgrestError {
                code: code.map(str::to_string),
                message: Some(message.to_string()),
                ..Default::default()
            },
        })
    }

    #[test]
    fn test_transport_flags_win() {
        assert_eq!(classify(&transport("whatever", true, false)), ErrorKind::Timeout);
        assert_eq!(
            classify(&transport("whatever", false, true)),
            ErrorKind::DatabaseUnavailable
        );
    }

    #[test]
    fn test_connection_refused_message() {
        let failure = transport(
            "error sending request: tcp connect error: Connection refused (os error 111)",
            false,
            false,
        );
        assert_eq!(classify(&failure), ErrorKind::DatabaseUnavailable);
    }

    #[test]
    fn test_gateway_errors_are_unavailable() {
        assert_eq!(
            classify(&api(503, None, "upstream down")),
            ErrorKind::DatabaseUnavailable
        );
    }

    #[test]
    fn test_missing_function() {
        assert_eq!(
            classify(&api(
                404,
                Some("PGRST202"),
                "Could not find the function public.match_island_chunks in the schema cache"
            )),
            ErrorKind::RpcFunctionMissing
        );
        assert_eq!(
            classify(&api(
                404,
                None,
                "function match_island_chunks(vector) does not exist"
            )),
            ErrorKind::RpcFunctionMissing
        );
    }

    #[test]
    fn test_permission_denied() {
        assert_eq!(
            classify(&api(403, Some("42501"), "permission denied for table")),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            classify(&api(401, None, "Invalid API key")),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_statement_timeout() {
        assert_eq!(
            classify(&api(500, Some("57014"), "canceling statement due to statement timeout")),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn test_generic_store_error() {
        assert_eq!(
            classify(&api(400, Some("22P02"), "invalid input syntax for type vector")),
            ErrorKind::SupabaseGeneric
        );
        assert_eq!(
            classify(&PipelineFailure::Retrieval(StoreError::MalformedResponse(
                "expected array".to_string()
            ))),
            ErrorKind::SupabaseGeneric
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(
            classify(&transport("something odd happened", false, false)),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_stage_kinds() {
        assert_eq!(
            classify(&PipelineFailure::Embedding(EmbeddingError::EmptyResponse)),
            ErrorKind::EmbeddingError
        );
        assert_eq!(
            classify(&PipelineFailure::Generation(GenerationError::RateLimited(
                "slow down".to_string()
            ))),
            ErrorKind::GenerationError
        );
        assert_eq!(
            classify(&PipelineFailure::Decode(DecodeError::NotAnArray("object"))),
            ErrorKind::DecodeError
        );
    }

    #[test]
    fn test_into_api_error_keeps_details() {
        let err: ApiError = transport("connection refused", false, true).into();
        assert_eq!(err.kind(), ErrorKind::DatabaseUnavailable);
        assert!(err.to_string().contains("connection refused"));
    }
}
