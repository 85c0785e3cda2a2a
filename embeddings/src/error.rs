use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// No API key configured for a provider that needs one
    #[error("Missing API key for embedding provider")]
    MissingApiKey,

    /// Invalid input provided to embedding service
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure talking to the provider
    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Embedding API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Provider answered but produced no vector
    #[error("No embedding generated")]
    EmptyResponse,

    /// Provider produced a vector of unexpected length
    #[error("Embedding dimension {actual} does not match expected dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
