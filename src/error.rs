//! Error types for the workflow CI tooling.
//!
//! The validator never returns these: malformed workflow content becomes
//! issues in a [`crate::validator::ValidationReport`]. Everything around it
//! (file access, LLM calls, state files) propagates [`Error`].

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for CI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status:?}): {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("Unexpected API response structure: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("Missing configuration: {0} is not set")]
    MissingConfig(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Could not extract workflow ID from URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Json {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
