use crate::chunking::chunk_file;
use anyhow::{Context, Result};
use coderag_codebase_retrieval::HybridSearch;
use ignore::WalkBuilder;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// What to ingest and how
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub respect_gitignore: bool,
    pub chunking: bool,
}

/// Counters reported after an ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_discovered: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub documents_added: usize,
}

/// Per-file progress callback: (done, total, path)
pub type ProgressCallback = Box<dyn Fn(usize, usize, &Path) + Send + Sync>;

/// Files under `options.root` with a configured extension, sorted by path
pub fn discover_files(options: &IngestOptions) -> Result<Vec<PathBuf>> {
    let ignore_dirs = options.ignore_dirs.clone();
    let mut builder = WalkBuilder::new(&options.root);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let ignored = entry.depth() > 0
                && is_dir
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| ignore_dirs.iter().any(|dir| dir == name));
            !ignored
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.context("Failed to walk directory")?;
        let path = entry.path();

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if !has_extension(path, &options.extensions) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    debug!(
        "Discovered {} files under {}",
        files.len(),
        options.root.display()
    );
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

/// Embed every discovered file (or each of its chunks) into the index, then
/// save it.
///
/// Unreadable files and documents whose embedding is unavailable are skipped
/// with a warning. A dimension mismatch aborts the run.
pub async fn ingest_directory(
    search: &HybridSearch,
    options: &IngestOptions,
    progress: Option<ProgressCallback>,
) -> Result<IngestStats> {
    let files = discover_files(options)?;
    let mut stats = IngestStats {
        files_discovered: files.len(),
        ..Default::default()
    };
    info!(
        "Ingesting {} files from {}",
        files.len(),
        options.root.display()
    );

    for (i, path) in files.iter().enumerate() {
        if let Some(report) = &progress {
            report(i + 1, files.len(), path);
        }

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                stats.files_failed += 1;
                continue;
            }
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filepath = pathdiff::diff_paths(path, &options.root)
            .unwrap_or_else(|| path.clone())
            .to_string_lossy()
            .into_owned();

        let documents: Vec<String> = if options.chunking {
            chunk_file(path, &content)
                .into_iter()
                .map(|chunk| chunk.content)
                .collect()
        } else {
            vec![content]
        };

        let mut added = 0;
        for document in documents.iter().filter(|d| !d.trim().is_empty()) {
            let position = search
                .add_document(document, &filename, &filepath)
                .await
                .with_context(|| format!("Failed to index {filepath}"))?;
            if position.is_some() {
                added += 1;
            }
        }

        if added == 0 {
            debug!("Nothing indexed for {filepath}");
            stats.files_skipped += 1;
        } else {
            stats.files_indexed += 1;
            stats.documents_added += added;
        }
    }

    search
        .store()
        .save()
        .await
        .context("Failed to save index")?;

    info!(
        "Indexed {} files ({} documents), skipped {}, failed {}",
        stats.files_indexed, stats.documents_added, stats.files_skipped, stats.files_failed
    );
    Ok(stats)
}
