use crate::chat::ChatMessage;
use crate::chat::ChatProvider;
use crate::chat::ChatRequest;
use crate::error::ContextError;
use crate::error::Result;
use crate::query_analyzer::QueryEnhancer;
use crate::query_analyzer::QueryIntent;
use crate::rerank::LlmReranker;
use crate::rerank::RerankConfig;
use coderag_codebase_retrieval::HybridSearch;
use coderag_codebase_retrieval::SearchRequest;
use coderag_codebase_retrieval::SearchResult;
use coderag_codebase_retrieval::is_valid_alpha;
use log::debug;
use log::info;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Reply used when retrieval finds nothing; the chat model is not called
pub const NO_RESULTS_REPLY: &str = "No relevant code found for your query.";

const SYSTEM_PROMPT: &str = "You are an expert coding assistant. Your task is to help users \
with their question. Use the retrieved code context to inform your responses, but feel free \
to suggest better solutions if appropriate.";

/// Configuration for retrieval-augmented answering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Results requested from hybrid search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Fusion weight passed to hybrid search
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Add synonym terms to the keyword signal
    #[serde(default = "default_true")]
    pub enable_query_expansion: bool,

    /// Let the chat model reorder results
    #[serde(default = "default_true")]
    pub enable_reranking: bool,

    /// Leading results placed in the prompt
    #[serde(default = "default_context_results")]
    pub context_results: usize,

    /// Upper bound on the formatted context, in characters
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_top_k() -> usize {
    5
}

fn default_alpha() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_context_results() -> usize {
    3
}

fn default_max_context_chars() -> usize {
    24_000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            alpha: default_alpha(),
            enable_query_expansion: true,
            enable_reranking: true,
            context_results: default_context_results(),
            max_context_chars: default_max_context_chars(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl RagConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        if !is_valid_alpha(self.alpha) {
            return Err(format!("alpha must be in [0.0, 1.0], got {}", self.alpha));
        }
        if self.context_results == 0 {
            return Err("context_results must be > 0".to_string());
        }
        if self.max_context_chars == 0 {
            return Err("max_context_chars must be > 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be in [0.0, 2.0], got {}",
                self.temperature
            ));
        }
        Ok(())
    }
}

/// Everything retrieved for one query
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub query: String,
    pub intent: QueryIntent,

    /// Keyword terms added by expansion (empty when disabled)
    pub expanded_terms: BTreeSet<String>,

    /// Ranked results, after reranking when enabled
    pub results: Vec<SearchResult>,

    /// Context block handed to the chat model
    pub formatted_context: String,
}

/// Answer with the context it was generated from
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub context: RetrievedContext,
}

/// Retrieval-augmented question answering over the code index
pub struct RagOrchestrator {
    config: RagConfig,
    search: Arc<HybridSearch>,
    enhancer: QueryEnhancer,
    reranker: Option<LlmReranker>,
    chat: Arc<dyn ChatProvider>,
}

impl RagOrchestrator {
    pub fn new(
        config: RagConfig,
        search: Arc<HybridSearch>,
        chat: Arc<dyn ChatProvider>,
        rerank_config: RerankConfig,
    ) -> Result<Self> {
        config.validate().map_err(ContextError::InvalidConfig)?;
        rerank_config
            .validate()
            .map_err(ContextError::InvalidConfig)?;

        let reranker = config
            .enable_reranking
            .then(|| LlmReranker::new(Arc::clone(&chat), rerank_config));

        Ok(Self {
            config,
            search,
            enhancer: QueryEnhancer::new()?,
            reranker,
            chat,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn search(&self) -> &Arc<HybridSearch> {
        &self.search
    }

    /// Search, optionally rerank, and format the leading results
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let intent = self.enhancer.extract_intent(query);
        let expanded_terms = if self.config.enable_query_expansion {
            self.enhancer.expand_query(query)
        } else {
            BTreeSet::new()
        };
        debug!("Query intent: {intent}, {} expansion terms", expanded_terms.len());

        let request = SearchRequest::new(query, self.config.top_k)
            .with_alpha(self.config.alpha)
            .with_extra_terms(expanded_terms.iter().cloned());
        let mut results = self.search.search_request(&request).await?.results;

        if let Some(reranker) = &self.reranker {
            results = reranker
                .rerank(query, results, Some(self.config.top_k))
                .await;
        }

        let context_len = self.config.context_results.min(results.len());
        let formatted_context =
            format_context(&results[..context_len], self.config.max_context_chars);

        Ok(RetrievedContext {
            query: query.to_string(),
            intent,
            expanded_terms,
            results,
            formatted_context,
        })
    }

    /// Retrieve context and ask the chat model to answer `query`
    pub async fn answer(&self, query: &str) -> Result<RagAnswer> {
        let context = self.retrieve(query).await?;

        if context.results.is_empty() {
            info!("No results for '{query}'");
            return Ok(RagAnswer {
                answer: NO_RESULTS_REPLY.to_string(),
                context,
            });
        }

        let request = ChatRequest::new(vec![
            ChatMessage::system(self.config.system_prompt.clone()),
            ChatMessage::user(build_user_prompt(
                query,
                context.intent,
                &context.formatted_context,
            )),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let answer = self.chat.complete(&request).await?;
        Ok(RagAnswer { answer, context })
    }
}

/// `File: {filename}\n{content}` blocks separated by blank lines, cut at
/// `max_chars` characters.
pub fn format_context(results: &[SearchResult], max_chars: usize) -> String {
    let mut formatted = String::new();
    let mut used = 0;

    for result in results {
        let separator = if formatted.is_empty() { "" } else { "\n\n" };
        let block = format!("File: {}\n{}", result.filename, result.content);

        let remaining = max_chars.saturating_sub(used + separator.len());
        if remaining == 0 {
            break;
        }

        formatted.push_str(separator);
        let block_chars = block.chars().count();
        if block_chars <= remaining {
            formatted.push_str(&block);
            used += separator.len() + block_chars;
        } else {
            formatted.extend(block.chars().take(remaining));
            break;
        }
    }

    formatted
}

fn build_user_prompt(query: &str, intent: QueryIntent, code_context: &str) -> String {
    format!(
        "Based on the user's query and the following code context, provide a helpful \
         response. If improvements can be made, suggest them with explanations.\n\n\
         User Query: {query}\n\
         Query Intent: {intent}\n\n\
         Retrieved Code Context:\n{code_context}\n\n\
         Your response:"
    )
}
