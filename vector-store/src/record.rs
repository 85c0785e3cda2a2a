use serde::{Deserialize, Serialize};

/// A single indexed piece of source code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRecord {
    /// The indexed text
    pub content: String,

    /// File name without directories
    pub filename: String,

    /// Path relative to the watched root
    pub filepath: String,
}

impl DocumentRecord {
    /// Create a new record
    pub fn new(
        content: impl Into<String>,
        filename: impl Into<String>,
        filepath: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            filepath: filepath.into(),
        }
    }

    /// First `max_chars` characters of the content, with `...` appended when
    /// the content was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.content[..byte_idx]),
            None => self.content.clone(),
        }
    }

    /// Number of lines in the content
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}
