use serde::{Deserialize, Serialize};

/// Which signals produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchSource {
    /// Only from vector search
    Semantic,
    /// Only from keyword scoring
    Keyword,
    /// Found by both
    Hybrid,
}

impl SearchSource {
    pub(crate) fn from_signals(semantic: bool, keyword: bool) -> Self {
        match (semantic, keyword) {
            (true, true) => Self::Hybrid,
            (false, true) => Self::Keyword,
            _ => Self::Semantic,
        }
    }
}

/// A single search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Position of the document in the index
    pub position: usize,

    pub filename: String,

    /// Path relative to the watched root
    pub filepath: String,

    pub content: String,

    /// Semantic similarity (0 when the document was not a semantic candidate)
    pub semantic_score: f32,

    /// Normalized keyword score in [0, 1]
    pub keyword_score: f32,

    /// `alpha * semantic_score + (1 - alpha) * keyword_score`
    pub fused_score: f32,

    /// Source of this result
    pub source: SearchSource,

    /// Rank in the result list (0 = best)
    pub rank: usize,
}

impl SearchResult {
    /// First `max_chars` characters of the content, `...` appended if cut
    pub fn preview(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.content[..byte_idx]),
            None => self.content.clone(),
        }
    }

    /// Set rank
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }
}

/// Collection of search results with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Query that produced these results
    pub query: String,

    /// Search results
    pub results: Vec<SearchResult>,

    /// Number of distinct candidates before truncation
    pub total_candidates: usize,

    /// Search statistics
    pub stats: SearchStats,
}

/// Search performance statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total search time in milliseconds
    pub total_time_ms: u64,

    /// Query embedding time in milliseconds
    pub embed_time_ms: u64,

    /// Vector search time in milliseconds
    pub semantic_time_ms: u64,

    /// Keyword scoring time in milliseconds
    pub keyword_time_ms: u64,

    /// Fusion time in milliseconds
    pub fusion_time_ms: u64,

    /// Number of semantic candidates
    pub semantic_count: usize,

    /// Number of keyword candidates
    pub keyword_count: usize,

    /// Whether the query embedding was available
    pub semantic_available: bool,

    /// Alpha used for fusion
    pub alpha: f32,
}

impl SearchResults {
    /// Create new search results
    pub fn new(query: String) -> Self {
        Self {
            query,
            results: Vec::new(),
            total_candidates: 0,
            stats: SearchStats::default(),
        }
    }

    /// Add results
    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    /// Set total candidates
    pub fn with_total_candidates(mut self, count: usize) -> Self {
        self.total_candidates = count;
        self
    }

    /// Set stats
    pub fn with_stats(mut self, stats: SearchStats) -> Self {
        self.stats = stats;
        self
    }

    /// Get top N results
    pub fn top(&self, n: usize) -> &[SearchResult] {
        &self.results[..n.min(self.results.len())]
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }
}
