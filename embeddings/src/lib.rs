//! # CodeRAG Embeddings
//!
//! Text embedding providers for semantic code search. The retrieval engine
//! only depends on the [`EmbeddingProvider`] trait; [`OpenAiEmbeddings`] is
//! the HTTP implementation for OpenAI-compatible `/embeddings` endpoints.
//!
//! ## Example
//!
//! ```no_run
//! use coderag_embeddings::{EmbeddingConfig, EmbeddingProvider, OpenAiEmbeddings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = OpenAiEmbeddings::new(EmbeddingConfig::default())?;
//!     let embedding = service.embed("fn hello() { println!(\"Hello\"); }").await?;
//!     println!("Generated a {}-dimensional embedding", embedding.len());
//!     Ok(())
//! }
//! ```

mod error;
mod provider;
mod service;

pub use error::EmbeddingError;
pub use provider::EmbeddingProvider;
pub use service::EmbeddingConfig;
pub use service::OpenAiEmbeddings;

/// Dimension of `text-embedding-ada-002` vectors.
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Default embedding model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
