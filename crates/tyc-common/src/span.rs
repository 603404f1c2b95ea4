//! Source spans and offset-to-position conversion.
//!
//! Diagnostics carry byte offsets internally (start + length, like every
//! other handle in the pipeline). [`LineIndex`] converts offsets into 1-based
//! line/column pairs at the output boundary.

use serde::{Deserialize, Serialize};

/// Stable handle for one analyzed file. Allocated by the driver when a
/// file is first seen and never reused, so cross-file references stay
/// valid when other files churn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A half-open byte range into one file's source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub len: u32,
}

impl Span {
    pub const ZERO: Span = Span { start: 0, len: 0 };

    pub fn new(start: u32, len: u32) -> Self {
        Span { start, len }
    }

    #[inline]
    pub fn end(self) -> u32 {
        self.start + self.len
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        Span {
            start,
            len: end - start,
        }
    }
}

/// A 1-based line/column position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Precomputed newline offsets for one file, for O(log n) position lookup.
#[derive(Clone, Debug, Default)]
pub struct LineIndex {
    /// Byte offset of the start of each line. line_starts[0] == 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        LineIndex { line_starts }
    }

    /// Convert a byte offset to a 1-based line/column pair.
    /// Offsets past the end of text clamp to the last line.
    pub fn line_col(&self, offset: u32) -> LineCol {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        LineCol {
            line: line as u32 + 1,
            col: offset.saturating_sub(line_start) + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_basic() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_col(0), LineCol { line: 1, col: 1 });
        assert_eq!(index.line_col(1), LineCol { line: 1, col: 2 });
        assert_eq!(index.line_col(3), LineCol { line: 2, col: 1 });
        assert_eq!(index.line_col(6), LineCol { line: 3, col: 1 });
        assert_eq!(index.line_col(7), LineCol { line: 4, col: 1 });
    }

    #[test]
    fn span_cover() {
        let a = Span::new(4, 2);
        let b = Span::new(10, 5);
        assert_eq!(a.cover(b), Span::new(4, 11));
        assert_eq!(b.cover(a), Span::new(4, 11));
    }
}
