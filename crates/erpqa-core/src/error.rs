use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Why an index build was rejected for lack of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyCorpus {
    /// The chunk sequence itself was empty.
    NoChunks,
    /// Chunks were supplied but every one was blank after trimming.
    AllBlank { given: usize },
}

impl fmt::Display for EmptyCorpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChunks => write!(f, "no chunks were given to the index build"),
            Self::AllBlank { given } => write!(f, "all {given} chunks were blank or had nothing to embed"),
        }
    }
}

/// Failure reported by a generation backend.
///
/// Kept distinct from [`Error`] so callers can tell an unreachable backend
/// apart from one that answered with nothing.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend unreachable: {0}")]
    Unavailable(String),

    #[error("generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response from generation backend: {0}")]
    Malformed(String),

    #[error("generation backend returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Empty corpus: {0}")]
    EmptyCorpus(EmptyCorpus),

    #[error("Index not built: build or load an index first")]
    IndexNotBuilt,

    #[error("No index found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("No index to save: build or load an index first")]
    NoIndexToSave,

    #[error("Unsupported index format at {}: {reason}", .path.display())]
    IndexFormat { path: PathBuf, reason: String },

    #[error("Loading a serialized index is disabled (refused {})", .0.display())]
    IndexLoadDisabled(PathBuf),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IndexFormat { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
