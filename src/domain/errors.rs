//! Domain errors for faultline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or querying a [`SourceIndex`](crate::services::SourceIndex).
#[derive(Debug, Error)]
pub enum SourceIndexError {
    #[error("Failed to read source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load Python grammar: {0}")]
    Grammar(String),

    #[error("Failed to parse source {0}")]
    Parse(String),
}

/// Errors surfaced by a convergence tool while decoding model output.
///
/// The engine logs these and treats the round as producing no candidates.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Model output is not valid JSON: {0}")]
    Decode(String),

    #[error("Failed to write generated tests to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Errors from the remote generation service.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unexpected response payload: {0}")]
    Payload(String),

    #[error("Missing API key: set FAULTLINE_BACKEND__API_KEY or OPENAI_API_KEY")]
    MissingApiKey,
}

impl BackendError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => {
                status.as_u16() == 429 || status.is_server_error()
            }
            Self::Payload(_) | Self::MissingApiKey => false,
        }
    }
}

/// Errors from running the external test framework.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Test run timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to read report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from writing run artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SourceIndexResult<T> = Result<T, SourceIndexError>;
