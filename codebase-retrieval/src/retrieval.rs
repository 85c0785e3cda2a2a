use crate::config::{DistanceMetric, RetrievalConfig, is_valid_alpha};
use crate::error::{Result, RetrievalError};
use crate::fusion::{FusionEngine, SemanticHit};
use crate::keyword::KeywordScorer;
use crate::result::{SearchResult, SearchResults, SearchSource, SearchStats};
use coderag_embeddings::EmbeddingProvider;
use coderag_vector_store::{DocumentRecord, IndexSnapshot, IndexStore, cosine_similarity};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Parameters of one search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,

    /// Number of results to return
    pub k: usize,

    /// Fusion weight; the configured alpha when `None`
    pub alpha: Option<f32>,

    /// Additional keyword terms, e.g. from query expansion. Never embedded.
    pub extra_terms: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, k: usize) -> Self {
        Self {
            query: query.into(),
            k,
            alpha: None,
            extra_terms: Vec::new(),
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_extra_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_terms.extend(terms.into_iter().map(Into::into));
        self
    }
}

/// Hybrid search over an [`IndexStore`], combining vector similarity with
/// keyword scoring.
pub struct HybridSearch {
    config: RetrievalConfig,
    store: Arc<IndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridSearch {
    /// Create new hybrid search engine
    pub fn new(
        config: RetrievalConfig,
        store: Arc<IndexStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        if embedder.dimension() != store.dimension() {
            return Err(RetrievalError::InvalidConfig(format!(
                "embedding dimension {} does not match index dimension {}",
                embedder.dimension(),
                store.dimension()
            )));
        }

        info!(
            "Initializing hybrid search (alpha {}, metric {})",
            config.alpha, config.distance_metric
        );

        Ok(Self {
            config,
            store,
            embedder,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Top `k` documents for `query`, fused with weight `alpha`
    pub async fn search(&self, query: &str, k: usize, alpha: f32) -> Result<Vec<SearchResult>> {
        let request = SearchRequest::new(query, k).with_alpha(alpha);
        Ok(self.search_request(&request).await?.results)
    }

    /// Run a search and report per-stage statistics.
    ///
    /// An unavailable query embedding yields an empty result, or a
    /// keyword-only one when `keyword_fallback` is set. It is never an error.
    pub async fn search_request(&self, request: &SearchRequest) -> Result<SearchResults> {
        let start = Instant::now();
        let alpha = request.alpha.unwrap_or(self.config.alpha);
        if !is_valid_alpha(alpha) {
            return Err(RetrievalError::InvalidAlpha(alpha));
        }

        let mut stats = SearchStats {
            alpha,
            ..Default::default()
        };
        let empty = SearchResults::new(request.query.clone());

        if request.k == 0 || request.query.trim().is_empty() {
            debug!("Empty query or k = 0, nothing to search");
            return Ok(empty);
        }

        let snapshot = self.store.snapshot().await;
        if snapshot.is_empty() {
            debug!("Index is empty");
            return Ok(empty);
        }

        let search_k = request
            .k
            .saturating_mul(self.config.candidate_multiplier)
            .min(snapshot.len());
        debug!(
            "Hybrid search for '{}' (k {}, search_k {search_k})",
            request.query, request.k
        );

        let embed_start = Instant::now();
        let query_vector = self.embed_query(&request.query, &snapshot).await;
        stats.embed_time_ms = embed_start.elapsed().as_millis() as u64;
        stats.semantic_available = query_vector.is_some();

        if query_vector.is_none() && !self.config.keyword_fallback {
            stats.total_time_ms = start.elapsed().as_millis() as u64;
            return Ok(empty.with_stats(stats));
        }

        // Stage 1: Semantic search
        let semantic_start = Instant::now();
        let semantic_hits = match &query_vector {
            Some(vector) => self.semantic_candidates(&snapshot, vector, search_k)?,
            None => Vec::new(),
        };
        stats.semantic_time_ms = semantic_start.elapsed().as_millis() as u64;
        stats.semantic_count = semantic_hits.len();

        // Stage 2: Keyword search
        let keyword_start = Instant::now();
        let keyword_hits = KeywordScorer::new(&request.query)
            .with_terms(&request.extra_terms)
            .search(snapshot.metadata().get_all(), search_k);
        stats.keyword_time_ms = keyword_start.elapsed().as_millis() as u64;
        stats.keyword_count = keyword_hits.len();

        // Stage 3: Fusion
        let fusion_start = Instant::now();
        let fused = FusionEngine::new(alpha).fuse(&semantic_hits, &keyword_hits);
        stats.fusion_time_ms = fusion_start.elapsed().as_millis() as u64;
        let total_candidates = fused.len();

        let results: Vec<SearchResult> = fused
            .into_iter()
            .filter_map(|candidate| {
                let Some(record) = snapshot.record(candidate.position) else {
                    warn!(
                        "Skipping candidate at position {} outside the metadata ({} records)",
                        candidate.position,
                        snapshot.metadata().len()
                    );
                    return None;
                };
                Some(SearchResult {
                    position: candidate.position,
                    filename: record.filename.clone(),
                    filepath: record.filepath.clone(),
                    content: record.content.clone(),
                    semantic_score: candidate.semantic_score,
                    keyword_score: candidate.keyword_score,
                    fused_score: candidate.fused_score,
                    source: SearchSource::from_signals(
                        candidate.from_semantic,
                        candidate.from_keyword,
                    ),
                    rank: 0,
                })
            })
            .take(request.k)
            .enumerate()
            .map(|(rank, result)| result.with_rank(rank))
            .collect();

        stats.total_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Search completed in {}ms, returned {} results",
            stats.total_time_ms,
            results.len()
        );

        Ok(empty
            .with_results(results)
            .with_total_candidates(total_candidates)
            .with_stats(stats))
    }

    /// Embed `content` and append it to the index.
    ///
    /// Returns `Ok(None)` when the embedding is unavailable; the document is
    /// skipped. A wrong-dimension embedding is an error and changes nothing.
    pub async fn add_document(
        &self,
        content: &str,
        filename: &str,
        filepath: &str,
    ) -> Result<Option<usize>> {
        let embedding = match self.embedder.embed(content).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Skipping {filepath}: embedding unavailable: {e}");
                return Ok(None);
            }
        };

        let position = self
            .store
            .add_document(embedding, DocumentRecord::new(content, filename, filepath))
            .await?;
        Ok(Some(position))
    }

    /// Delete the persisted index and reset to empty
    pub async fn clear_index(&self) -> Result<()> {
        self.store.clear().await?;
        Ok(())
    }

    /// Number of indexed documents
    pub async fn count(&self) -> usize {
        self.store.count().await
    }

    async fn embed_query(&self, query: &str, snapshot: &IndexSnapshot) -> Option<Vec<f32>> {
        match self.embedder.embed(query).await {
            Ok(vector) if vector.len() == snapshot.dimension() => Some(vector),
            Ok(vector) => {
                warn!(
                    "Query embedding has dimension {}, index has {}; no semantic signal",
                    vector.len(),
                    snapshot.dimension()
                );
                None
            }
            Err(e) => {
                warn!("Query embedding unavailable: {e}");
                None
            }
        }
    }

    fn semantic_candidates(
        &self,
        snapshot: &IndexSnapshot,
        query_vector: &[f32],
        search_k: usize,
    ) -> Result<Vec<SemanticHit>> {
        let neighbors = snapshot.index().search(query_vector, search_k)?;
        let use_cosine =
            self.config.distance_metric == DistanceMetric::Cosine && snapshot.has_embeddings();

        Ok(neighbors
            .into_iter()
            .map(|neighbor| {
                let cached = use_cosine
                    .then(|| snapshot.embeddings().get(neighbor.position))
                    .flatten();
                let score = match cached {
                    Some(vector) => cosine_similarity(query_vector, vector),
                    None => 1.0 / (1.0 + neighbor.distance),
                };
                SemanticHit {
                    position: neighbor.position,
                    score,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coderag_embeddings::EmbeddingError;
    use coderag_vector_store::IndexPaths;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Embeds texts from a fixed table and fails for anything else
    struct TableEmbedder {
        dim: usize,
        table: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        fn new(dim: usize, entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                dim,
                table: entries
                    .iter()
                    .map(|(text, vector)| (text.to_string(), vector.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        fn dimension(&self) -> usize {
            self.dim
        }

        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            self.table
                .get(text)
                .cloned()
                .ok_or(EmbeddingError::EmptyResponse)
        }
    }

    const AUTH: &str = "alpha handles auth";
    const BILLING: &str = "beta handles billing";

    async fn setup(config: RetrievalConfig) -> (HybridSearch, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(IndexStore::new(IndexPaths::in_dir(dir.path()), 4).unwrap());
        let embedder = TableEmbedder::new(
            4,
            &[
                (AUTH, vec![1.0, 0.0, 0.0, 0.0]),
                (BILLING, vec![0.0, 1.0, 0.0, 0.0]),
                ("login", vec![1.0, 0.0, 0.0, 0.0]),
                ("billing", vec![0.9, 0.1, 0.0, 0.0]),
                ("wrong dim", vec![1.0, 0.0]),
            ],
        );
        let search = HybridSearch::new(config, store, Arc::new(embedder)).unwrap();
        search
            .add_document(AUTH, "auth.py", "src/auth.py")
            .await
            .unwrap();
        search
            .add_document(BILLING, "billing.py", "src/billing.py")
            .await
            .unwrap();
        (search, dir)
    }

    #[tokio::test]
    async fn test_semantic_only_example() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        let results = search.search("login", 1, 1.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, AUTH);
        assert!(results[0].semantic_score > 0.0);
        assert_eq!(results[0].keyword_score, 0.0);
        assert_eq!(results[0].rank, 0);
    }

    #[tokio::test]
    async fn test_cosine_score_on_default_metric() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        // [0.9, 0.1, 0, 0] against [1, 0, 0, 0]
        let results = search.search("billing", 2, 1.0).await.unwrap();
        assert_eq!(results[0].content, AUTH);
        let expected = 0.9 / (0.9f32 * 0.9 + 0.1 * 0.1).sqrt();
        assert!((results[0].semantic_score - expected).abs() < 1e-6);
        assert!((results[0].semantic_score - 0.99391).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_huge_k_is_clamped_to_index_size() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        let results = search.search("login", usize::MAX, 1.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, AUTH);

        let results = search.search("billing", usize::MAX, 0.5).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_l2_metric_transform() {
        let config = RetrievalConfig {
            distance_metric: DistanceMetric::L2,
            ..Default::default()
        };
        let (search, _dir) = setup(config).await;

        let results = search.search("login", 2, 1.0).await.unwrap();
        assert_eq!(results[0].semantic_score, 1.0);
        // squared distance 2 => 1 / 3
        assert!((results[1].semantic_score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_alpha_zero_follows_keywords() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        // The embedding prefers auth, the keywords prefer billing.
        let results = search.search("billing", 2, 0.0).await.unwrap();
        assert_eq!(results[0].content, BILLING);
        assert!(results[0].keyword_score > 0.0);

        let results = search.search("billing", 2, 1.0).await.unwrap();
        assert_eq!(results[0].content, AUTH);
    }

    #[tokio::test]
    async fn test_fused_scores_carry_both_components() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        let results = search.search("billing", 2, 0.5).await.unwrap();
        for result in &results {
            let expected = 0.5 * result.semantic_score + 0.5 * result.keyword_score;
            assert!((result.fused_score - expected).abs() < 1e-6);
        }
        let billing = results.iter().find(|r| r.content == BILLING).unwrap();
        assert_eq!(billing.source, SearchSource::Hybrid);
    }

    #[tokio::test]
    async fn test_invalid_alpha_rejected() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;
        assert!(matches!(
            search.search("login", 1, 1.5).await,
            Err(RetrievalError::InvalidAlpha(_))
        ));
        assert!(search.search("login", 1, f32::NAN).await.is_err());
    }

    #[test_log::test(tokio::test)]
    async fn test_embedding_failure_returns_empty() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        let results = search
            .search_request(&SearchRequest::new("handles", 2))
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(!results.stats.semantic_available);
    }

    #[test_log::test(tokio::test)]
    async fn test_keyword_fallback_when_enabled() {
        let config = RetrievalConfig {
            keyword_fallback: true,
            ..Default::default()
        };
        let (search, _dir) = setup(config).await;

        let results = search.search("handles auth", 2, 0.7).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, AUTH);
        assert!(results.iter().all(|r| r.semantic_score == 0.0));
    }

    #[test_log::test(tokio::test)]
    async fn test_wrong_dimension_query_is_unavailable() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;
        assert!(search.search("wrong dim", 2, 0.5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extra_terms_widen_keyword_recall() {
        let config = RetrievalConfig {
            keyword_fallback: true,
            ..Default::default()
        };
        let (search, _dir) = setup(config).await;

        let request = SearchRequest::new("invoice", 2)
            .with_alpha(0.0)
            .with_extra_terms(["billing"]);
        let results = search.search_request(&request).await.unwrap();
        assert_eq!(results.results[0].content, BILLING);
        assert_eq!(results.stats.keyword_count, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_add_document_skips_on_embedding_failure() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        let position = search
            .add_document("not in the table", "x.py", "x.py")
            .await
            .unwrap();
        assert_eq!(position, None);
        assert_eq!(search.count().await, 2);
    }

    #[tokio::test]
    async fn test_add_document_dimension_mismatch() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;

        let err = search
            .add_document("wrong dim", "x.py", "x.py")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::VectorStore(_)));

        let snapshot = search.store().snapshot().await;
        assert_eq!(snapshot.index().len(), 2);
        assert_eq!(snapshot.metadata().len(), 2);
        assert_eq!(snapshot.embeddings().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_index_twice() {
        let (search, _dir) = setup(RetrievalConfig::default()).await;
        search.clear_index().await.unwrap();
        search.clear_index().await.unwrap();
        assert_eq!(search.count().await, 0);
        assert!(search.search("login", 3, 0.5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_between_embedder_and_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(IndexStore::new(IndexPaths::in_dir(dir.path()), 8).unwrap());
        let embedder = Arc::new(TableEmbedder::new(4, &[]));
        assert!(matches!(
            HybridSearch::new(RetrievalConfig::default(), store, embedder),
            Err(RetrievalError::InvalidConfig(_))
        ));
    }
}
