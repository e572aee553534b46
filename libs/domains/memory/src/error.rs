use thiserror::Error;

/// Result type for semantic memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors that can occur in the memory domain
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<qdrant_client::QdrantError> for MemoryError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        MemoryError::Store(e.to_string())
    }
}
