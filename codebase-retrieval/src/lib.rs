/*!
# Codebase Retrieval

Hybrid retrieval for code search combining:
- **Semantic search** via exact L2 search over code embeddings
- **Keyword search** via term frequency with a phrase bonus
- **Linear fusion** of both signals with a tunable weight `alpha`

## Architecture

```text
Query
  ├─> Embed (EmbeddingProvider)
  │     └─> FlatL2Index::search (search_k = 3k)
  │           └─> cosine or 1/(1+d) scores
  ├─> KeywordScorer (search_k = 3k)
  │     └─> normalized term-frequency scores
  └─> Fusion: alpha * semantic + (1 - alpha) * keyword
        └─> stable sort, top k
```

Both signals read the same index snapshot. If the query cannot be embedded
the search returns nothing, or degrades to keyword-only when
`keyword_fallback` is enabled.

## Example

```rust,no_run
use coderag_codebase_retrieval::{HybridSearch, RetrievalConfig};
use coderag_embeddings::{EmbeddingConfig, OpenAiEmbeddings};
use coderag_vector_store::{IndexPaths, IndexStore};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let embedder = Arc::new(OpenAiEmbeddings::new(EmbeddingConfig::default())?);
    let store = Arc::new(IndexStore::open(IndexPaths::in_dir(Path::new(".coderag")), 1536).await?);

    let search = HybridSearch::new(RetrievalConfig::default(), store, embedder)?;
    let results = search.search("async function error handling", 5, 0.7).await?;

    for result in &results {
        println!("{}. {} (score: {:.2})", result.rank + 1, result.filepath, result.fused_score);
    }

    Ok(())
}
```
*/

mod config;
mod error;
mod fusion;
mod keyword;
mod result;
mod retrieval;

pub use config::{DistanceMetric, RetrievalConfig, is_valid_alpha};
pub use error::{Result, RetrievalError};
pub use fusion::{FusedCandidate, FusionEngine, SemanticHit};
pub use keyword::{KeywordHit, KeywordScorer, PHRASE_BONUS, tokenize};
pub use result::{SearchResult, SearchResults, SearchSource, SearchStats};
pub use retrieval::{HybridSearch, SearchRequest};
