/*!
# Codebase Context Provider

Turns hybrid search results into answers: query expansion and intent
detection, optional reranking by a chat model, and the retrieval-augmented
answer flow.

## Architecture

```text
User Query
  ├─> QueryEnhancer (intent + synonym expansion)
  └─> HybridSearch (semantic + keyword, expanded terms widen keywords)
        └─> LlmReranker (optional, best effort)
              └─> Context block (top results, character budget)
                    └─> ChatProvider (answer)
```

## Example

```rust,no_run
use coderag_codebase_context::{ChatConfig, OpenAiChat, RagConfig, RagOrchestrator, RerankConfig};
use coderag_codebase_retrieval::{HybridSearch, RetrievalConfig};
use coderag_embeddings::{EmbeddingConfig, OpenAiEmbeddings};
use coderag_vector_store::{IndexPaths, IndexStore};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let embedder = Arc::new(OpenAiEmbeddings::new(EmbeddingConfig::default())?);
    let store = Arc::new(IndexStore::open(IndexPaths::in_dir(Path::new(".coderag")), 1536).await?);
    let search = Arc::new(HybridSearch::new(RetrievalConfig::default(), store, embedder)?);
    let chat = Arc::new(OpenAiChat::new(ChatConfig::default())?);

    let rag = RagOrchestrator::new(RagConfig::default(), search, chat, RerankConfig::default())?;
    let answer = rag.answer("How do I handle async errors?").await?;

    println!("{}", answer.answer);
    Ok(())
}
```
*/

mod chat;
mod error;
mod query_analyzer;
mod rag;
mod rerank;

pub use chat::{ChatConfig, ChatMessage, ChatProvider, ChatRequest, OpenAiChat, Role};
pub use error::{ChatError, ContextError, Result};
pub use query_analyzer::{QueryEnhancer, QueryIntent};
pub use rag::{
    NO_RESULTS_REPLY, RagAnswer, RagConfig, RagOrchestrator, RetrievedContext, format_context,
};
pub use rerank::{LlmReranker, RerankConfig, apply_ranking, parse_ranking};
