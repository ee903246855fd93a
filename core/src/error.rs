//! Error types for the event-store client.
//!
//! # Design
//! Whole-call failures (`ApiError`) always reach the caller. Line-level
//! failures (`LineDecodeError`, `CodecError`) never do: the NDJSON decoder
//! turns them into discarded lines and keeps going.

use thiserror::Error;

/// Errors returned by `EventStoreClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A construction-time setting is missing or empty.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation argument was rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request never produced a response (connect, TLS, timeout, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server rejected the bearer token (401 or 403).
    #[error("unauthorized: HTTP {status}")]
    Unauthorized { status: u16 },

    /// The server answered with a status outside 200..=299.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A plain-text response body was not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// True for failures at the HTTP layer, including non-2xx statuses.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_) | ApiError::Unauthorized { .. } | ApiError::HttpStatus { .. }
        )
    }
}

/// Why a single NDJSON line contributed nothing to a result sequence.
#[derive(Debug, Error)]
pub enum LineDecodeError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Mapping failures between wire JSON and event shapes.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be a {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("malformed timestamp `{value}`: {source}")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
