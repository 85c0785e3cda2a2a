use crate::error::ContextError;
use crate::error::Result;
use coderag_codebase_retrieval::tokenize;
use log::debug;
use regex_lite::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Programming-term synonyms used to widen keyword recall
const SYNONYMS: &[(&str, &[&str])] = &[
    ("function", &["def", "method", "procedure", "routine"]),
    ("variable", &["var", "parameter", "argument", "param"]),
    ("error", &["exception", "bug", "issue", "problem"]),
    ("loop", &["for", "while", "iterate", "iteration"]),
    ("class", &["object", "type", "struct"]),
    ("import", &["from", "include", "require", "load"]),
    ("return", &["output", "result", "yield"]),
    ("print", &["log", "output", "display", "show"]),
];

/// Intent patterns, tested in this order; the first match wins
const INTENT_PATTERNS: &[(QueryIntent, &str)] = &[
    (
        QueryIntent::Debug,
        r"\b(error|bug|fix|issue|problem|exception|traceback)\b",
    ),
    (
        QueryIntent::Implement,
        r"\b(how to|create|make|implement|build|write|code)\b",
    ),
    (
        QueryIntent::Understand,
        r"\b(what|why|how does|explain|understand|meaning)\b",
    ),
    (QueryIntent::Find, r"\b(find|search|locate|where|show me)\b"),
    (
        QueryIntent::Optimize,
        r"\b(optimize|improve|better|faster|efficient)\b",
    ),
];

/// What the user is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Debug,
    Implement,
    Understand,
    Find,
    Optimize,
    General,
}

impl QueryIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Implement => "implement",
            Self::Understand => "understand",
            Self::Find => "find",
            Self::Optimize => "optimize",
            Self::General => "general",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query expansion and intent classification
pub struct QueryEnhancer {
    // Pre-compiled, in priority order
    intent_patterns: Vec<(QueryIntent, Regex)>,
}

impl QueryEnhancer {
    /// Create new query enhancer
    pub fn new() -> Result<Self> {
        let intent_patterns = INTENT_PATTERNS
            .iter()
            .map(|(intent, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (*intent, regex))
                    .map_err(|e| ContextError::QueryAnalysis(format!("{intent} pattern: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { intent_patterns })
    }

    /// Lower-cased query tokens plus the synonyms of any known term.
    ///
    /// Only meant to widen keyword matching; the original query is still what
    /// gets embedded.
    pub fn expand_query(&self, query: &str) -> BTreeSet<String> {
        let words = tokenize(query);
        let mut expanded: BTreeSet<String> = words.iter().cloned().collect();

        for word in &words {
            if let Some((_, synonyms)) = SYNONYMS.iter().find(|(term, _)| *term == word.as_str()) {
                expanded.extend(synonyms.iter().map(|s| (*s).to_string()));
            }
        }

        debug!("Expanded '{query}' to {} terms", expanded.len());
        expanded
    }

    /// Classify the query by the first matching intent pattern
    pub fn extract_intent(&self, query: &str) -> QueryIntent {
        let query_lower = query.to_lowercase();
        self.intent_patterns
            .iter()
            .find(|(_, regex)| regex.is_match(&query_lower))
            .map(|(intent, _)| *intent)
            .unwrap_or(QueryIntent::General)
    }
}
