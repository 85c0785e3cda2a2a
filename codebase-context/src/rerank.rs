use crate::chat::ChatMessage;
use crate::chat::ChatProvider;
use crate::chat::ChatRequest;
use coderag_codebase_retrieval::SearchResult;
use log::debug;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Configuration for LLM reranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Result lists of this length or shorter are returned untouched
    #[serde(default = "default_min_results")]
    pub min_results: usize,

    /// Number of leading candidates shown to the judge
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Content characters per candidate in the digest
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_min_results() -> usize {
    3
}

fn default_max_candidates() -> usize {
    10
}

fn default_preview_chars() -> usize {
    200
}

fn default_max_tokens() -> u32 {
    100
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            min_results: default_min_results(),
            max_candidates: default_max_candidates(),
            preview_chars: default_preview_chars(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl RerankConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_candidates == 0 {
            return Err("max_candidates must be > 0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be > 0".to_string());
        }
        Ok(())
    }
}

/// Reorders search results by asking a chat model to rank them.
///
/// Best effort: when the judge fails the input comes back unchanged, and
/// whatever the judge answers the output is a permutation of the input.
pub struct LlmReranker {
    chat: Arc<dyn ChatProvider>,
    config: RerankConfig,
}

impl LlmReranker {
    pub fn new(chat: Arc<dyn ChatProvider>, config: RerankConfig) -> Self {
        Self { chat, config }
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    /// Rerank `results` for `query`, keeping at most `top_k` when given
    pub async fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        top_k: Option<usize>,
    ) -> Vec<SearchResult> {
        if results.len() <= self.config.min_results {
            return results;
        }

        let request = ChatRequest::new(vec![ChatMessage::user(self.build_prompt(query, &results))])
            .with_temperature(0.0)
            .with_max_tokens(self.config.max_tokens);

        match self.chat.complete(&request).await {
            Ok(response) => {
                let order = parse_ranking(&response, results.len());
                debug!("Judge ranked {} of {} results", order.len(), results.len());
                apply_ranking(results, &order, top_k)
            }
            Err(e) => {
                warn!("Reranking failed, keeping original order: {e}");
                results
            }
        }
    }

    /// Numbered digest of the leading candidates
    pub fn build_prompt(&self, query: &str, results: &[SearchResult]) -> String {
        let summaries: Vec<String> = results
            .iter()
            .take(self.config.max_candidates)
            .enumerate()
            .map(|(i, result)| {
                format!(
                    "{i}: {} - {}",
                    result.filename,
                    result.preview(self.config.preview_chars)
                )
            })
            .collect();

        format!(
            "Query: \"{query}\"\n\n\
             Rank these code snippets by relevance to the query (most relevant first).\n\
             Return only numbers separated by commas (e.g., \"2,0,4,1,3\"):\n\n\
             {}\n\n\
             Rankings:",
            summaries.join("\n")
        )
    }
}

/// Indices from a comma-separated judge answer.
///
/// Tokens that are not plain non-negative integers, indices outside
/// `0..len` and repeats are dropped.
pub fn parse_ranking(response: &str, len: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    response
        .trim()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|token| token.parse::<usize>().ok())
        .filter(|&index| index < len && seen.insert(index))
        .collect()
}

/// Reorder `results` by `order`, append unmentioned results in their
/// original order, then truncate to `top_k`.
pub fn apply_ranking(
    results: Vec<SearchResult>,
    order: &[usize],
    top_k: Option<usize>,
) -> Vec<SearchResult> {
    let mut slots: Vec<Option<SearchResult>> = results.into_iter().map(Some).collect();
    let mut reranked = Vec::with_capacity(slots.len());

    for &index in order {
        if let Some(result) = slots.get_mut(index).and_then(Option::take) {
            reranked.push(result);
        }
    }
    reranked.extend(slots.into_iter().flatten());

    if let Some(k) = top_k {
        reranked.truncate(k);
    }

    reranked
        .into_iter()
        .enumerate()
        .map(|(rank, result)| result.with_rank(rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use async_trait::async_trait;
    use coderag_codebase_retrieval::SearchSource;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct ScriptedChat {
        reply: Result<String, String>,
        prompts: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err("judge offline".to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedChat {
        async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
            self.prompts.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|message| ChatError::Api {
                status: 503,
                message,
            })
        }
    }

    fn result(i: usize) -> SearchResult {
        SearchResult {
            position: i,
            filename: format!("f{i}.py"),
            filepath: format!("src/f{i}.py"),
            content: format!("def f{i}(): pass"),
            semantic_score: 0.0,
            keyword_score: 0.0,
            fused_score: 1.0 - i as f32 / 100.0,
            source: SearchSource::Semantic,
            rank: i,
        }
    }

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n).map(result).collect()
    }

    fn positions(results: &[SearchResult]) -> Vec<usize> {
        results.iter().map(|r| r.position).collect()
    }

    #[tokio::test]
    async fn test_short_lists_pass_through() {
        let chat = ScriptedChat::replying("2,1,0");
        let reranker = LlmReranker::new(chat.clone(), RerankConfig::default());

        let out = reranker.rerank("q", results(3), Some(1)).await;
        assert_eq!(positions(&out), vec![0, 1, 2]);
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_reorders_by_judge() {
        let chat = ScriptedChat::replying("3, 1,0");
        let reranker = LlmReranker::new(chat.clone(), RerankConfig::default());

        let out = reranker.rerank("q", results(5), None).await;
        assert_eq!(positions(&out), vec![3, 1, 0, 2, 4]);
        assert_eq!(out.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);

        let requests = chat.prompts.lock().unwrap();
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 100);
    }

    #[tokio::test]
    async fn test_truncates_to_top_k() {
        let reranker = LlmReranker::new(ScriptedChat::replying("4,3"), RerankConfig::default());
        let out = reranker.rerank("q", results(6), Some(3)).await;
        assert_eq!(positions(&out), vec![4, 3, 0]);
    }

    #[test_log::test(tokio::test)]
    async fn test_judge_failure_keeps_order() {
        let reranker = LlmReranker::new(ScriptedChat::failing(), RerankConfig::default());
        let out = reranker.rerank("q", results(5), Some(2)).await;
        assert_eq!(positions(&out), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_output_is_permutation_for_malformed_answers() {
        let answers = [
            "",
            "I think 2 is best",
            "9, 9, 100, -1, 2",
            "1,1,1,1",
            "0, x, 3.5, 4 ,, 2",
            "4,3,2,1,0,5,6,7",
            "Rankings: 3,2",
        ];
        for answer in answers {
            let reranker = LlmReranker::new(ScriptedChat::replying(answer), RerankConfig::default());
            let out = reranker.rerank("q", results(5), None).await;
            let mut sorted = positions(&out);
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4], "answer {answer:?}");
        }
    }

    #[test]
    fn test_parse_ranking() {
        assert_eq!(parse_ranking("2,0,4,1,3", 5), vec![2, 0, 4, 1, 3]);
        assert_eq!(parse_ranking(" 1 , 1, 7, a, 0 ", 5), vec![1, 0]);
        assert_eq!(parse_ranking("+1,-2", 5), Vec::<usize>::new());
    }

    #[test]
    fn test_prompt_digest() {
        let reranker = LlmReranker::new(ScriptedChat::replying(""), RerankConfig::default());
        let mut long = result(0);
        long.content = "x".repeat(250);
        let candidates: Vec<SearchResult> = std::iter::once(long).chain((1..12).map(result)).collect();

        let prompt = reranker.build_prompt("parse config", &candidates);
        assert!(prompt.starts_with("Query: \"parse config\""));
        assert!(prompt.contains(&format!("0: f0.py - {}...", "x".repeat(200))));
        assert!(prompt.contains("9: f9.py - def f9(): pass"));
        assert!(!prompt.contains("10: f10.py"));
        assert!(prompt.ends_with("Rankings:"));
    }
}
