use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] coderag_codebase_retrieval::RetrievalError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Invalid context configuration: {0}")]
    InvalidConfig(String),

    #[error("Query analysis failed: {0}")]
    QueryAnalysis(String),
}

/// Errors from the chat completion provider
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Missing API key for chat provider")]
    MissingApiKey,

    #[error("Invalid chat configuration: {0}")]
    InvalidConfig(String),

    #[error("Chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Chat API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Chat completion contained no message")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, ContextError>;
