//! Term-frequency keyword scoring over the metadata corpus.

use coderag_vector_store::DocumentRecord;
use std::collections::{BTreeSet, HashMap};

/// Multiplier applied when the whole query phrase occurs in a document.
///
/// Per-document term frequencies of distinct terms sum to at most 1, so raw
/// scores never exceed this value.
pub const PHRASE_BONUS: f32 = 10.0;

/// Split text into lower-cased word tokens (letters, digits and `_`)
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A scored keyword candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordHit {
    pub position: usize,
    /// Raw score in `[0, PHRASE_BONUS]`
    pub score: f32,
}

impl KeywordHit {
    /// Score scaled into `[0, 1]` for fusion
    pub fn normalized(&self) -> f32 {
        (self.score / PHRASE_BONUS).min(1.0)
    }
}

/// Scores documents by the term frequency of query terms, boosted when the
/// document contains the query verbatim.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    phrase: String,
    terms: BTreeSet<String>,
}

impl KeywordScorer {
    pub fn new(query: &str) -> Self {
        Self {
            phrase: query.trim().to_lowercase(),
            terms: tokenize(query).into_iter().collect(),
        }
    }

    /// Widen the term set. The phrase bonus still uses the original query.
    pub fn with_terms<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in extra {
            self.terms.extend(tokenize(term.as_ref()));
        }
        self
    }

    pub fn terms(&self) -> &BTreeSet<String> {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Raw score of one document
    pub fn score(&self, content: &str) -> f32 {
        let tokens = tokenize(content);
        if tokens.is_empty() || self.terms.is_empty() {
            return 0.0;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.as_str()).or_default() += 1;
        }

        let total = tokens.len() as f32;
        let phrase_match =
            !self.phrase.is_empty() && content.to_lowercase().contains(&self.phrase);
        let weight = if phrase_match { PHRASE_BONUS } else { 1.0 };

        self.terms
            .iter()
            .filter_map(|term| counts.get(term.as_str()))
            .map(|&count| count as f32 / total * weight)
            .sum()
    }

    /// Positions of documents scoring above zero, best first (ties by
    /// position), truncated to `k`.
    pub fn search(&self, documents: &[DocumentRecord], k: usize) -> Vec<KeywordHit> {
        if k == 0 || self.terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<KeywordHit> = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| KeywordHit {
                position,
                score: self.score(&doc.content),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn docs(contents: &[&str]) -> Vec<DocumentRecord> {
        contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                DocumentRecord::new(*content, format!("f{i}.py"), format!("src/f{i}.py"))
            })
            .collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("def parse_config(path): return Über"),
            vec!["def", "parse_config", "path", "return", "über"]
        );
        assert!(tokenize("  ,;  ").is_empty());
    }

    #[test]
    fn test_term_frequency_score() {
        let scorer = KeywordScorer::new("parse json");
        // 1 "parse" out of 4 tokens, no phrase match
        let score = scorer.score("parse the yaml file");
        assert!((score - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_phrase_bonus() {
        let scorer = KeywordScorer::new("Parse JSON");
        // "parse" and "json" each 1/4, phrase present
        let score = scorer.score("we parse json here");
        assert!((score - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_document_scores_zero() {
        let scorer = KeywordScorer::new("anything");
        assert_eq!(scorer.score(""), 0.0);
        assert_eq!(scorer.score("!!! ???"), 0.0);
    }

    #[test]
    fn test_search_orders_and_filters() {
        let corpus = docs(&[
            "billing invoice",
            "auth handler for login",
            "login login login",
            "",
        ]);
        let hits = KeywordScorer::new("login").search(&corpus, 10);
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![2, 1]);
        assert!(hits.iter().all(|h| h.normalized() <= 1.0));
    }

    #[test]
    fn test_search_truncates_and_breaks_ties_by_position() {
        let corpus = docs(&["alpha beta", "beta alpha", "alpha beta"]);
        let hits = KeywordScorer::new("alpha").search(&corpus, 2);
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_extra_terms_widen_recall() {
        let corpus = docs(&["raise exception when missing"]);
        let plain = KeywordScorer::new("error");
        assert!(plain.search(&corpus, 5).is_empty());

        let widened = KeywordScorer::new("error").with_terms(["exception", "bug"]);
        assert_eq!(widened.search(&corpus, 5).len(), 1);
        assert!(widened.terms().contains("exception"));
    }

    #[test]
    fn test_normalized_score_bounds() {
        let hit = KeywordHit {
            position: 0,
            score: PHRASE_BONUS,
        };
        assert_eq!(hit.normalized(), 1.0);
    }
}
