//! Byte spans attached to AST nodes and the line/column index used when
//! rendering them in diagnostics.

/// Half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Cached index of line start offsets for byte-to-line/column conversion.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    line_starts: Vec<usize>,
}

impl SourceIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                starts.push(i + 1);
            }
        }
        Self {
            line_starts: starts,
        }
    }

    /// Convert a byte offset to 0-based (line, column).
    pub fn to_line_col(&self, byte: usize) -> (usize, usize) {
        match self.line_starts.binary_search(&byte) {
            Ok(line) => (line, 0),
            Err(insert_pos) => {
                let line = insert_pos.saturating_sub(1);
                let start = self.line_starts.get(line).copied().unwrap_or(0);
                (line, byte.saturating_sub(start))
            }
        }
    }
}
