use thiserror::Error;

/// Errors that can occur during vector store operations
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Vector length differs from the index dimension
    #[error("Embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index dimension must be positive
    #[error("Invalid index dimension: {0}")]
    InvalidDimension(usize),

    /// Persisted collections disagree on the number of documents
    #[error("Index holds {index} vectors but metadata holds {metadata} records")]
    Misaligned { index: usize, metadata: usize },

    /// Persisted index blob could not be decoded
    #[error("Corrupt index file: {0}")]
    CorruptIndex(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary encoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, VectorStoreError>;
