use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the semantic signal is scored for fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity against the cached embedding, range [-1, 1].
    /// Falls back to `L2` when the embedding cache is unavailable.
    #[default]
    Cosine,
    /// `1 / (1 + squared L2 distance)`, range (0, 1]
    L2,
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "l2" | "euclidean" => Ok(Self::L2),
            other => Err(format!("unknown distance metric: {other}")),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::L2 => write!(f, "l2"),
        }
    }
}

/// Configuration for hybrid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Weight of the semantic signal in the fused score (0.0 - 1.0);
    /// the keyword signal gets `1 - alpha`
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Semantic scoring metric
    #[serde(default)]
    pub distance_metric: DistanceMetric,

    /// Each signal fetches `candidate_multiplier * k` candidates before fusion
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// Number of results when the caller does not ask for a specific count
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Keep searching keyword-only when the query cannot be embedded,
    /// instead of returning no results
    #[serde(default)]
    pub keyword_fallback: bool,
}

fn default_alpha() -> f32 {
    0.7
}

fn default_candidate_multiplier() -> usize {
    3
}

fn default_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            distance_metric: DistanceMetric::default(),
            candidate_multiplier: default_candidate_multiplier(),
            default_k: default_k(),
            keyword_fallback: false,
        }
    }
}

/// Whether `alpha` is a usable fusion weight
pub fn is_valid_alpha(alpha: f32) -> bool {
    (0.0..=1.0).contains(&alpha)
}

impl RetrievalConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_alpha(self.alpha) {
            return Err(format!("alpha must be in [0.0, 1.0], got {}", self.alpha));
        }

        if self.candidate_multiplier == 0 {
            return Err("candidate_multiplier must be > 0".to_string());
        }

        if self.default_k == 0 {
            return Err("default_k must be > 0".to_string());
        }

        Ok(())
    }

    /// Rank purely by embedding similarity
    pub fn semantic() -> Self {
        Self {
            alpha: 1.0,
            ..Default::default()
        }
    }

    /// Rank purely by keyword overlap, still embedding the query
    pub fn lexical() -> Self {
        Self {
            alpha: 0.0,
            keyword_fallback: true,
            ..Default::default()
        }
    }
}
