use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Vector store error: {0}")]
    VectorStore(#[from] coderag_vector_store::VectorStoreError),

    #[error("alpha must be in [0.0, 1.0], got {0}")]
    InvalidAlpha(f32),

    #[error("Invalid retrieval configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
