//! # CodeRAG Vector Store
//!
//! Storage for the retrieval index: an exact L2 vector index, the
//! per-document metadata, and the raw embeddings used for cosine re-scoring.
//! The three collections are position-aligned and only ever grow together.
//!
//! ## Example
//!
//! ```no_run
//! use coderag_vector_store::{DocumentRecord, IndexPaths, IndexStore};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = IndexStore::open(IndexPaths::in_dir(Path::new(".coderag")), 4).await?;
//!
//!     store
//!         .add_document(
//!             vec![1.0, 0.0, 0.0, 0.0],
//!             DocumentRecord::new("fn auth() {}", "auth.rs", "src/auth.rs"),
//!         )
//!         .await?;
//!     store.save().await?;
//!
//!     let snapshot = store.snapshot().await;
//!     let hits = snapshot.index().search(&[1.0, 0.0, 0.0, 0.0], 5)?;
//!     println!("Found {} neighbours", hits.len());
//!     Ok(())
//! }
//! ```

mod codec;
mod distance;
mod error;
mod flat_index;
mod metadata;
mod record;
mod store;

pub use distance::{cosine_similarity, dot_product, squared_l2};
pub use error::{Result, VectorStoreError};
pub use flat_index::{FlatL2Index, Neighbor};
pub use metadata::{EmbeddingCache, MetadataStore};
pub use record::DocumentRecord;
pub use store::{IndexPaths, IndexSnapshot, IndexStore};
