use anyhow::{Context, Result, bail};
use coderag_codebase_context::{ChatConfig, RagConfig, RerankConfig};
use coderag_codebase_retrieval::{DistanceMetric, RetrievalConfig};
use coderag_embeddings::EmbeddingConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "coderag.toml";

/// Index directory name under the watched directory
pub const DEFAULT_INDEX_DIR: &str = ".coderag";

/// Application configuration.
///
/// Layered: built-in defaults, then the TOML file, then `.env` and the
/// process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory to ingest
    #[serde(default = "default_watched_dir")]
    pub watched_dir: PathBuf,

    /// Where the index lives; `<watched_dir>/.coderag` when unset
    #[serde(default)]
    pub index_dir: Option<PathBuf>,

    /// File extensions to ingest, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped at any depth
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Also skip what `.gitignore` files exclude
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Split files into blocks before embedding
    #[serde(default)]
    pub enable_code_chunking: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub rerank: RerankConfig,
}

fn default_watched_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_ignore_dirs() -> Vec<String> {
    [".venv", "node_modules", "__pycache__", ".git", "tests"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watched_dir: default_watched_dir(),
            index_dir: None,
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
            respect_gitignore: true,
            enable_code_chunking: false,
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
            retrieval: RetrievalConfig::default(),
            rag: RagConfig::default(),
            rerank: RerankConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `coderag.toml` when it exists,
    /// then apply `.env` and environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            warn!("Ignoring unreadable .env file: {e}");
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides, reading variables through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key.clone());
            self.chat.api_key = Some(key);
        }
        if let Some(base) = lookup("OPENAI_API_BASE") {
            self.embedding.api_base = base.clone();
            self.chat.api_base = base;
        }
        if let Some(model) = lookup("OPENAI_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(model) = lookup("OPENAI_CHAT_MODEL") {
            self.chat.model = model;
        }
        if let Some(dim) = lookup("EMBEDDING_DIM") {
            self.embedding.dimension = parse_var("EMBEDDING_DIM", &dim)?;
        }
        if let Some(metric) = lookup("RAG_DISTANCE_METRIC") {
            self.retrieval.distance_metric = metric
                .parse::<DistanceMetric>()
                .map_err(anyhow::Error::msg)
                .context("Invalid RAG_DISTANCE_METRIC")?;
        }
        if let Some(alpha) = lookup("HYBRID_SEARCH_ALPHA") {
            let alpha = parse_var("HYBRID_SEARCH_ALPHA", &alpha)?;
            self.retrieval.alpha = alpha;
            self.rag.alpha = alpha;
        }
        if let Some(value) = lookup("ENABLE_QUERY_EXPANSION") {
            self.rag.enable_query_expansion = parse_flag(&value);
        }
        if let Some(value) = lookup("ENABLE_LLM_RERANKING") {
            self.rag.enable_reranking = parse_flag(&value);
        }
        if let Some(value) = lookup("ENABLE_CODE_CHUNKING") {
            self.enable_code_chunking = parse_flag(&value);
        }
        if let Some(dir) = lookup("WATCHED_DIR") {
            self.watched_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("CODERAG_INDEX_DIR") {
            self.index_dir = Some(PathBuf::from(dir));
        }
        if let Some(top_k) = lookup("RAG_TOP_K") {
            let top_k = parse_var("RAG_TOP_K", &top_k)?;
            self.rag.top_k = top_k;
            self.retrieval.default_k = top_k;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            bail!("At least one file extension must be configured");
        }
        self.embedding.validate().map_err(anyhow::Error::msg)?;
        self.chat.validate().map_err(anyhow::Error::msg)?;
        self.retrieval.validate().map_err(anyhow::Error::msg)?;
        self.rag.validate().map_err(anyhow::Error::msg)?;
        self.rerank.validate().map_err(anyhow::Error::msg)?;
        Ok(())
    }

    /// Resolved index directory
    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.watched_dir.join(DEFAULT_INDEX_DIR))
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {name} '{value}': {e}"))
}

/// Only a case-insensitive `true` enables a flag
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extensions, vec!["py".to_string()]);
        assert_eq!(config.index_dir(), PathBuf::from("./.coderag"));
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.chat.model, "gpt-4");
        assert_eq!(config.retrieval.distance_metric, DistanceMetric::Cosine);
        assert_eq!(config.rag.top_k, 5);
        assert!(config.rag.enable_query_expansion);
        assert!(config.rag.enable_reranking);
        assert!(!config.enable_code_chunking);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_API_BASE", "http://localhost:8080/v1"),
                ("OPENAI_CHAT_MODEL", "gpt-4o"),
                ("EMBEDDING_DIM", "768"),
                ("RAG_DISTANCE_METRIC", "L2"),
                ("HYBRID_SEARCH_ALPHA", "0.4"),
                ("ENABLE_LLM_RERANKING", "False"),
                ("ENABLE_CODE_CHUNKING", "TRUE"),
                ("WATCHED_DIR", "/srv/project"),
                ("RAG_TOP_K", "8"),
            ]))
            .unwrap();

        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.chat.api_base, "http://localhost:8080/v1");
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.retrieval.distance_metric, DistanceMetric::L2);
        assert_eq!(config.retrieval.alpha, 0.4);
        assert_eq!(config.rag.alpha, 0.4);
        assert!(!config.rag.enable_reranking);
        assert!(config.enable_code_chunking);
        assert_eq!(config.rag.top_k, 8);
        assert_eq!(config.index_dir(), PathBuf::from("/srv/project/.coderag"));
    }

    #[test]
    fn test_explicit_index_dir_wins() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("WATCHED_DIR", "/srv/project"),
                ("CODERAG_INDEX_DIR", "/var/lib/coderag"),
            ]))
            .unwrap();
        assert_eq!(config.index_dir(), PathBuf::from("/var/lib/coderag"));
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(env(&[("EMBEDDING_DIM", "wide")])).is_err());
        assert!(
            config
                .apply_env(env(&[("RAG_DISTANCE_METRIC", "manhattan")]))
                .is_err()
        );

        config
            .apply_env(env(&[("HYBRID_SEARCH_ALPHA", "1.5")]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coderag.toml");
        std::fs::write(
            &path,
            r#"
watched_dir = "src"
extensions = ["py", "pyi"]
enable_code_chunking = true

[retrieval]
alpha = 0.5
distance_metric = "l2"

[rag]
enable_reranking = false
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.watched_dir, PathBuf::from("src"));
        assert_eq!(config.extensions, vec!["py".to_string(), "pyi".to_string()]);
        assert!(config.enable_code_chunking);
        assert_eq!(config.retrieval.alpha, 0.5);
        assert_eq!(config.retrieval.distance_metric, DistanceMetric::L2);
        assert!(!config.rag.enable_reranking);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.ignore_dirs, default_ignore_dirs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::from_file(&dir.path().join("absent.toml")).is_err());
    }
}
