//! Text buffer with O(1) line slicing.

use std::sync::Arc;

/// Immutable buffer snapshot optimized for row access.
///
/// - Stores text as `Arc<str>` for cheap cloning.
/// - Precomputes line start offsets for O(1) line slicing.
/// - Handles missing trailing newline.
/// - Normalizes CRLF to LF.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: Arc<str>,
    /// Byte offsets where each line starts. Always starts with 0.
    /// Length = line_count + 1 (last entry is text.len()).
    line_starts: Vec<usize>,
    /// Length in characters, which is what the diff size ceiling is measured in.
    char_len: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl TextBuffer {
    /// Create a buffer from text. Normalizes CRLF to LF.
    pub fn new(input: &str) -> Self {
        let text = if input.contains("\r\n") {
            input.replace("\r\n", "\n")
        } else {
            input.to_owned()
        };
        let line_starts = compute_line_starts(&text);
        let char_len = text.chars().count();
        Self {
            text: text.into(),
            line_starts,
            char_len,
        }
    }

    /// Create a buffer from raw file bytes. Invalid UTF-8 is replaced with U+FFFD.
    pub fn from_bytes(input: &[u8]) -> Self {
        Self::new(&String::from_utf8_lossy(input))
    }

    /// Number of lines in the buffer.
    /// An empty buffer has 0 lines.
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.line_starts.len() - 1
        }
    }

    /// Text of a row (0-indexed), without the trailing newline.
    pub fn line(&self, row: usize) -> Option<&str> {
        if row >= self.line_count() {
            return None;
        }
        let start = self.line_starts[row];
        let end = self.line_starts[row + 1];
        let line = &self.text[start..end];
        Some(line.strip_suffix('\n').unwrap_or(line))
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Full text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Column (in chars) of the first non-whitespace character of `line`.
///
/// Blank lines report column 0.
pub fn first_non_whitespace_column(line: &str) -> usize {
    line.chars().position(|c| !c.is_whitespace()).unwrap_or(0)
}

/// Compute line start offsets.
fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    // If text doesn't end with newline, we still need the end marker
    if !text.is_empty() && !text.ends_with('\n') {
        starts.push(text.len());
    }
    starts
}
