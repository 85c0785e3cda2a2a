use crate::keyword::KeywordHit;
use indexmap::IndexMap;
use log::debug;

/// A semantic candidate with its similarity already transformed to a score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticHit {
    pub position: usize,
    pub score: f32,
}

/// A candidate after fusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedCandidate {
    pub position: usize,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub fused_score: f32,
    pub from_semantic: bool,
    pub from_keyword: bool,
}

/// Linear fusion: `alpha * semantic + (1 - alpha) * keyword`
pub struct FusionEngine {
    alpha: f32,
}

impl FusionEngine {
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    /// Union both candidate lists by position and order by fused score.
    ///
    /// Union order is semantic candidates as given, then keyword-only ones.
    /// The sort is stable, so equal fused scores keep that order. A signal
    /// missing for a position counts as zero.
    pub fn fuse(&self, semantic: &[SemanticHit], keyword: &[KeywordHit]) -> Vec<FusedCandidate> {
        debug!(
            "Linear fusion (alpha {}): {} semantic + {} keyword",
            self.alpha,
            semantic.len(),
            keyword.len()
        );

        let mut union: IndexMap<usize, FusedCandidate> = IndexMap::new();

        for hit in semantic {
            union.entry(hit.position).or_insert(FusedCandidate {
                position: hit.position,
                semantic_score: hit.score,
                keyword_score: 0.0,
                fused_score: 0.0,
                from_semantic: true,
                from_keyword: false,
            });
        }

        for hit in keyword {
            let candidate = union.entry(hit.position).or_insert(FusedCandidate {
                position: hit.position,
                semantic_score: 0.0,
                keyword_score: 0.0,
                fused_score: 0.0,
                from_semantic: false,
                from_keyword: true,
            });
            candidate.keyword_score = hit.normalized();
            candidate.from_keyword = true;
        }

        let mut fused: Vec<FusedCandidate> = union
            .into_values()
            .map(|mut candidate| {
                candidate.fused_score = self.alpha * candidate.semantic_score
                    + (1.0 - self.alpha) * candidate.keyword_score;
                candidate
            })
            .collect();

        fused.sort_by(|a, b| b.fused_score.total_cmp(&a.fused_score));

        debug!("Fusion produced {} candidates", fused.len());
        fused
    }
}
