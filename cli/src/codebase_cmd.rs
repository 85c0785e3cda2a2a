use crate::config::AppConfig;
use crate::ingest::{IngestOptions, ingest_directory};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use coderag_codebase_context::{OpenAiChat, RagOrchestrator};
use coderag_codebase_retrieval::{HybridSearch, SearchRequest, SearchResults};
use coderag_embeddings::OpenAiEmbeddings;
use coderag_vector_store::{IndexPaths, IndexStore};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

/// Hybrid code search and question answering over a local codebase
#[derive(Debug, Parser)]
#[command(name = "coderag", version)]
pub struct Cli {
    /// TOML config file (defaults to ./coderag.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interactive chat when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a directory for search
    Index(IndexArgs),

    /// Search the index
    Search(SearchArgs),

    /// Answer a single question using retrieved code
    Ask(AskArgs),

    /// Interactive question answering
    Chat,

    /// Show index statistics and the first entries
    Status(StatusArgs),

    /// Delete the index
    Clear(ClearArgs),
}

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Directory to index (defaults to the configured watched directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Drop the existing index first instead of appending to it
    #[arg(long)]
    pub clear: bool,

    /// Suppress per-file progress
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Weight of the semantic signal (0.0 - 1.0)
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Show code and search statistics
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// Question about the codebase
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// List the files the answer was based on
    #[arg(long)]
    pub show_context: bool,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value_t = 5)]
    pub entries: usize,

    /// Also print the first N stored vectors
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub vectors: usize,
}

#[derive(Debug, Parser)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = AppConfig::load(self.config.as_deref()).context("Failed to load config")?;

        match self.command {
            Some(Command::Index(args)) => run_index(config, args).await,
            Some(Command::Search(args)) => run_search(config, args).await,
            Some(Command::Ask(args)) => run_ask(config, args).await,
            Some(Command::Chat) | None => run_chat(config).await,
            Some(Command::Status(args)) => run_status(config, args).await,
            Some(Command::Clear(args)) => run_clear(config, args).await,
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<Arc<IndexStore>> {
    let index_dir = config.index_dir();
    let store = IndexStore::open(IndexPaths::in_dir(&index_dir), config.embedding.dimension)
        .await
        .with_context(|| format!("Failed to load index from {}", index_dir.display()))?;
    Ok(Arc::new(store))
}

fn open_search(config: &AppConfig, store: Arc<IndexStore>) -> Result<Arc<HybridSearch>> {
    let embedder = OpenAiEmbeddings::new(config.embedding.clone())
        .context("Failed to initialize embedding provider")?;
    let search = HybridSearch::new(config.retrieval.clone(), store, Arc::new(embedder))
        .context("Failed to initialize search")?;
    Ok(Arc::new(search))
}

async fn open_rag(config: &AppConfig) -> Result<RagOrchestrator> {
    let search = open_search(config, open_store(config).await?)?;
    let chat =
        OpenAiChat::new(config.chat.clone()).context("Failed to initialize chat provider")?;
    RagOrchestrator::new(
        config.rag.clone(),
        search,
        Arc::new(chat),
        config.rerank.clone(),
    )
    .context("Failed to initialize answering")
}

async fn run_index(mut config: AppConfig, args: IndexArgs) -> Result<()> {
    if let Some(path) = args.path {
        config.watched_dir = path;
    }
    if !config.watched_dir.is_dir() {
        bail!("Not a directory: {}", config.watched_dir.display());
    }

    let store = if args.clear {
        let store = IndexStore::new(
            IndexPaths::in_dir(&config.index_dir()),
            config.embedding.dimension,
        )
        .context("Failed to open index")?;
        store.clear().await.context("Failed to clear index")?;
        Arc::new(store)
    } else {
        open_store(&config).await?
    };
    let search = open_search(&config, store)?;

    println!(
        "{} Indexing {} into {}",
        "▶".bright_blue(),
        config.watched_dir.display(),
        config.index_dir().display()
    );

    let options = IngestOptions {
        root: config.watched_dir.clone(),
        extensions: config.extensions.clone(),
        ignore_dirs: config.ignore_dirs.clone(),
        respect_gitignore: config.respect_gitignore,
        chunking: config.enable_code_chunking,
    };
    let progress: Option<crate::ingest::ProgressCallback> = if args.quiet {
        None
    } else {
        Some(Box::new(|done: usize, total: usize, path: &Path| {
            println!("  {} {}", format!("[{done}/{total}]").dimmed(), path.display());
        }))
    };

    let stats = ingest_directory(&search, &options, progress)
        .await
        .context("Failed to index directory")?;

    println!("\n{} Indexing complete!", "✓".bright_green());
    println!("  Files indexed: {}", stats.files_indexed.bright_cyan());
    println!("  Files skipped: {}", stats.files_skipped.bright_cyan());
    println!("  Files failed: {}", stats.files_failed.bright_cyan());
    println!("  Documents added: {}", stats.documents_added.bright_cyan());
    println!("  Index size: {}", search.count().await.bright_cyan());

    Ok(())
}

async fn run_search(config: AppConfig, args: SearchArgs) -> Result<()> {
    let store = open_store(&config).await?;
    let search = open_search(&config, store)?;

    let mut request =
        SearchRequest::new(args.query, args.limit.unwrap_or(config.retrieval.default_k));
    if let Some(alpha) = args.alpha {
        request = request.with_alpha(alpha);
    }

    let results = search.search_request(&request).await.context("Search failed")?;
    if results.is_empty() {
        println!("{} No results found", "✗".bright_red());
        if search.count().await == 0 {
            println!("  The index is empty. Run 'coderag index' first.");
        }
        return Ok(());
    }

    print_results(&results, args.verbose);
    Ok(())
}

fn print_results(results: &SearchResults, verbose: bool) {
    println!(
        "{} Found {} results in {}ms\n",
        "✓".bright_green(),
        results.len().bright_cyan(),
        results.stats.total_time_ms.bright_cyan()
    );

    for result in &results.results {
        println!(
            "{}. {}",
            (result.rank + 1).bright_yellow(),
            result.filepath.bright_cyan()
        );
        println!(
            "   {} {:.3} {} {:.3} {} {:.3} {} {:?}",
            "Score:".bright_black(),
            result.fused_score.bright_green(),
            "semantic".bright_black(),
            result.semantic_score,
            "keyword".bright_black(),
            result.keyword_score,
            "Source:".bright_black(),
            result.source
        );

        if verbose {
            println!("\n   {}", "Code:".bright_black());
            for line in result.content.lines().take(10) {
                println!("   {}", line.dimmed());
            }
            if result.content.lines().count() > 10 {
                println!("   {}", "...".dimmed());
            }
        }
        println!();
    }

    if verbose {
        let stats = &results.stats;
        println!("{}", "Search Statistics:".bright_blue());
        println!("  Alpha: {}", stats.alpha);
        println!("  Embedding: {}ms", stats.embed_time_ms);
        println!(
            "  Semantic search: {}ms ({} candidates)",
            stats.semantic_time_ms, stats.semantic_count
        );
        println!(
            "  Keyword search: {}ms ({} candidates)",
            stats.keyword_time_ms, stats.keyword_count
        );
        println!("  Fusion: {}ms", stats.fusion_time_ms);
        if !stats.semantic_available {
            println!("  {} Query embedding unavailable", "!".bright_yellow());
        }
    }
}

async fn run_ask(config: AppConfig, args: AskArgs) -> Result<()> {
    let rag = open_rag(&config).await?;
    println!("{} {}", "Query:".bright_blue(), args.query);

    let answer = rag.answer(&args.query).await.context("Failed to answer")?;
    println!("\n{}\n{}", "Response:".bright_green(), answer.answer);

    if args.show_context && !answer.context.results.is_empty() {
        println!("\n{}", "Context:".bright_black());
        for result in &answer.context.results {
            println!(
                "  {} ({:.3})",
                result.filepath.bright_cyan(),
                result.fused_score
            );
        }
    }
    Ok(())
}

async fn run_chat(config: AppConfig) -> Result<()> {
    let rag = open_rag(&config).await?;

    println!("{}", "CodeRAG - Interactive Mode".bright_blue());
    println!("Type 'quit', 'exit', or 'q' to exit");
    println!("{}", "-".repeat(40));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "Ask your coding question:".bright_yellow());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let query = line.trim();
        if EXIT_COMMANDS.contains(&query.to_lowercase().as_str()) {
            println!("Goodbye!");
            break;
        }
        if query.is_empty() {
            continue;
        }

        println!("\n{}", "Searching...".dimmed());
        match rag.answer(query).await {
            Ok(answer) => println!("\n{}\n{}", "Response:".bright_green(), answer.answer),
            Err(e) => println!("\n{} {e}", "Error:".bright_red()),
        }
    }
    Ok(())
}

async fn run_status(config: AppConfig, args: StatusArgs) -> Result<()> {
    let index_dir = config.index_dir();
    let store = open_store(&config).await?;
    let snapshot = store.snapshot().await;

    if snapshot.is_empty() {
        println!(
            "{} Index is empty at {}",
            "✗".bright_red(),
            index_dir.display()
        );
        println!("  Run 'coderag index' to create an index.");
        return Ok(());
    }

    println!("{} Index Status", "▶".bright_blue());
    println!("  Location: {}", index_dir.display().bright_cyan());
    println!("  Documents: {}", snapshot.len().bright_cyan());
    println!("  Dimension: {}", snapshot.dimension().bright_cyan());
    if snapshot.has_embeddings() {
        println!("  Embedding cache: {}", "available".bright_green());
    } else {
        println!(
            "  Embedding cache: {} (scoring falls back to L2)",
            "unavailable".bright_yellow()
        );
    }

    let entries = snapshot.metadata().inspect(args.entries);
    if !entries.is_empty() {
        println!("\n{} First {} entries:", "▶".bright_blue(), entries.len());
    }
    for (i, record) in entries.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i.bright_yellow(),
            record.filepath.bright_cyan(),
            format!("({} lines)", record.line_count()).bright_black()
        );
        println!("     {}", record.preview(100).replace('\n', " ").dimmed());
    }

    let vectors = snapshot.index().vectors(args.vectors);
    if !vectors.is_empty() {
        println!("\n{} First {} vectors:", "▶".bright_blue(), vectors.len());
    }
    for (i, vector) in vectors.iter().enumerate() {
        println!("  {}. {}", i.bright_yellow(), format_vector(vector));
    }

    Ok(())
}

/// Leading components of a vector, e.g. `[0.1000, -0.2500, ... 1536 dims]`
fn format_vector(vector: &[f32]) -> String {
    const SHOWN: usize = 8;
    let head: Vec<String> = vector.iter().take(SHOWN).map(|v| format!("{v:.4}")).collect();
    if vector.len() > SHOWN {
        format!("[{}, ... {} dims]", head.join(", "), vector.len())
    } else {
        format!("[{}]", head.join(", "))
    }
}

async fn run_clear(config: AppConfig, args: ClearArgs) -> Result<()> {
    let index_dir = config.index_dir();

    if !args.yes {
        print!(
            "Are you sure you want to clear the index at {}? [y/N] ",
            index_dir.display()
        );
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let store = IndexStore::new(IndexPaths::in_dir(&index_dir), config.embedding.dimension)
        .context("Failed to open index")?;
    store.clear().await.context("Failed to clear index")?;

    println!("{} Index cleared", "✓".bright_green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["coderag"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from([
            "coderag",
            "search",
            "parse config",
            "-n",
            "3",
            "--alpha",
            "0.25",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        let Some(Command::Search(args)) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query, "parse config");
        assert_eq!(args.limit, Some(3));
        assert_eq!(args.alpha, Some(0.25));
        assert!(!args.verbose);
    }

    #[test]
    fn test_index_and_status_args() {
        let cli = Cli::try_parse_from(["coderag", "index", "src", "--clear"]).unwrap();
        let Some(Command::Index(args)) = cli.command else {
            panic!("expected index");
        };
        assert_eq!(args.path, Some(PathBuf::from("src")));
        assert!(args.clear);

        let cli = Cli::try_parse_from(["coderag", "status"]).unwrap();
        let Some(Command::Status(args)) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.entries, 5);
        assert_eq!(args.vectors, 0);

        let cli = Cli::try_parse_from(["coderag", "status", "--vectors", "2"]).unwrap();
        let Some(Command::Status(args)) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.vectors, 2);
    }

    #[test]
    fn test_format_vector() {
        assert_eq!(format_vector(&[1.0, -0.25]), "[1.0000, -0.2500]");
        let long = vec![0.5; 10];
        assert_eq!(
            format_vector(&long),
            "[0.5000, 0.5000, 0.5000, 0.5000, 0.5000, 0.5000, 0.5000, 0.5000, ... 10 dims]"
        );
    }
}
