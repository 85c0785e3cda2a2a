use log::{debug, warn};
use std::collections::VecDeque;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Upper bound on lines per block
pub const MAX_BLOCK_LINES: usize = 50;

/// A block is only cut at a definition once it holds more lines than this
const MIN_LINES_BEFORE_SPLIT: usize = 10;

const DEFINITION_PREFIXES: &[&str] = &["def ", "class ", "async def "];

/// Lines above a definition searched for import and comment context
const CONTEXT_LINES: usize = 5;

const CONTEXT_PREFIXES: &[&str] = &["import", "from", "#", "\"\"\"", "'''"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Function,
    Class,
    Block,
}

/// A unit of source embedded as its own document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChunk {
    pub content: String,
    pub kind: ChunkKind,
    pub name: String,

    /// First line of the code itself, 1-based
    pub start_line: usize,

    /// Last line, inclusive
    pub end_line: usize,
}

/// Split a source file into documents.
///
/// Python files are split per function and class; everything else, and
/// Python that yields no definitions, goes through [`chunk_by_blocks`].
pub fn chunk_file(path: &Path, content: &str) -> Vec<CodeChunk> {
    let is_python = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "py" || ext == "pyi");
    if is_python {
        extract_code_elements(content)
    } else {
        blocks_as_chunks(content)
    }
}

/// One chunk per Python function and class, nested ones included, in
/// breadth-first order.
///
/// Each chunk is prefixed with the import and comment lines among the five
/// lines above the definition. Source that does not parse cleanly, or has no
/// definitions, falls back to [`chunk_by_blocks`].
pub fn extract_code_elements(content: &str) -> Vec<CodeChunk> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        warn!("Python grammar unavailable, chunking by blocks: {e}");
        return blocks_as_chunks(content);
    }
    let Some(tree) = parser.parse(content, None) else {
        return blocks_as_chunks(content);
    };
    if tree.root_node().has_error() {
        debug!("Source has syntax errors, chunking by blocks");
        return blocks_as_chunks(content);
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let mut chunks = Vec::new();
    let mut queue = VecDeque::from([tree.root_node()]);
    while let Some(node) = queue.pop_front() {
        let kind = match node.kind() {
            "function_definition" => Some(ChunkKind::Function),
            "class_definition" => Some(ChunkKind::Class),
            _ => None,
        };
        if let Some(kind) = kind {
            chunks.push(definition_chunk(node, kind, content, &lines));
        }

        let mut cursor = node.walk();
        queue.extend(node.named_children(&mut cursor));
    }

    if chunks.is_empty() {
        return blocks_as_chunks(content);
    }
    chunks
}

fn definition_chunk(node: Node, kind: ChunkKind, source: &str, lines: &[&str]) -> CodeChunk {
    let start = node.start_position().row;
    let end_position = node.end_position();
    let end_row = if end_position.column == 0 && end_position.row > start {
        end_position.row
    } else {
        end_position.row + 1
    };
    let end = end_row.min(lines.len());

    let code = lines[start..end].join("\n");
    let context: Vec<&str> = lines[start.saturating_sub(CONTEXT_LINES)..start]
        .iter()
        .copied()
        .filter(|line| {
            let trimmed = line.trim();
            CONTEXT_PREFIXES
                .iter()
                .any(|prefix| trimmed.starts_with(prefix))
        })
        .collect();

    let content = if context.is_empty() {
        code
    } else {
        format!("{}\n\n{code}", context.join("\n"))
    };

    let name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .unwrap_or_default()
        .to_string();

    CodeChunk {
        content,
        kind,
        name,
        start_line: start + 1,
        end_line: end,
    }
}

fn blocks_as_chunks(content: &str) -> Vec<CodeChunk> {
    chunk_by_blocks(content, MAX_BLOCK_LINES)
        .into_iter()
        .enumerate()
        .map(|(i, block)| CodeChunk {
            content: block.content,
            kind: ChunkKind::Block,
            name: format!("block_{i}"),
            start_line: block.start_line,
            end_line: block.end_line,
        })
        .collect()
}

/// A contiguous run of source lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub content: String,

    /// First line, 1-based
    pub start_line: usize,

    /// Last line, inclusive
    pub end_line: usize,
}

/// Split `content` into blocks of at most `max_lines` lines.
///
/// A new block starts at a `def`/`class`/`async def` line once the current
/// block has grown past ten lines, or when it reaches `max_lines`. The line
/// that triggers the cut opens the next block.
pub fn chunk_by_blocks(content: &str, max_lines: usize) -> Vec<CodeBlock> {
    let max_lines = max_lines.max(2);
    let lines: Vec<&str> = content.split('\n').collect();

    let mut blocks = Vec::new();
    let mut start = 0;

    for (i, line) in lines.iter().enumerate() {
        let current_lines = i - start + 1;
        let at_definition = DEFINITION_PREFIXES
            .iter()
            .any(|prefix| line.trim_start().starts_with(prefix));

        let should_split = (at_definition && current_lines > MIN_LINES_BEFORE_SPLIT)
            || current_lines >= max_lines;
        if should_split && current_lines > 1 {
            blocks.push(block(&lines, start, i));
            start = i;
        }
    }

    if start < lines.len() {
        blocks.push(block(&lines, start, lines.len()));
    }

    blocks
}

fn block(lines: &[&str], start: usize, end: usize) -> CodeBlock {
    CodeBlock {
        content: lines[start..end].join("\n"),
        start_line: start + 1,
        end_line: end,
    }
}
