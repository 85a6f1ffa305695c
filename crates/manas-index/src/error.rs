//! Error types for manas-index.

use std::path::PathBuf;

use crate::document::LoadError;

/// Errors that can occur while building, loading, persisting, or querying the index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Source documents could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A persisted index file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted index file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The storage directory exists but a required file is absent.
    #[error("index storage is incomplete: {0} is missing")]
    MissingFile(PathBuf),

    /// A persisted index file is not valid JSON for its schema.
    #[error("index file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The index was built with a different embedding model than the one configured.
    #[error("index was built with embedding model '{stored}', but '{configured}' is configured")]
    ModelMismatch { stored: String, configured: String },

    #[error("embedding dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding provider failed while indexing a document.
    #[error("failed to embed {file_path}: {source}")]
    Embedding {
        file_path: String,
        source: manas_llm::LlmError,
    },

    /// The embedding provider failed while embedding a query.
    #[error("failed to embed query: {0}")]
    QueryEmbedding(#[source] manas_llm::LlmError),

    #[error("JSON serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl IndexError {
    /// Whether the persisted index itself is unusable, as opposed to a
    /// transient provider or filesystem-write failure.
    #[must_use]
    pub fn is_corrupt_store(&self) -> bool {
        matches!(
            self,
            Self::Read { .. }
                | Self::MissingFile(_)
                | Self::Corrupt { .. }
                | Self::UnsupportedVersion { .. }
                | Self::ModelMismatch { .. }
        )
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
