//! Metadata helpers for chunks.

use super::LineRange;
use sha2::{Digest, Sha256};

/// Calculate SHA-256 hash of text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Maps byte offsets of a text to 1-based line numbers.
pub(crate) struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let newlines = text
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i)
            .collect();
        Self { newlines }
    }

    /// Line containing the byte at `offset`.
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&pos| pos < offset) + 1
    }

    /// Lines covered by the non-empty byte range `start..end`.
    pub(crate) fn range(&self, start: usize, end: usize) -> LineRange {
        LineRange {
            from: self.line_of(start),
            to: self.line_of(end.saturating_sub(1).max(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_hash() {
        let hash = calculate_hash("Hello, world!");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, calculate_hash("Hello, world!"));
        assert_ne!(hash, calculate_hash("Different text"));
    }

    #[test]
    fn test_line_index() {
        let text = "one\ntwo\n\nfour";
        let index = LineIndex::new(text);

        assert_eq!(index.line_of(0), 1);
        // The newline byte itself belongs to the line it ends
        assert_eq!(index.line_of(3), 1);
        assert_eq!(index.line_of(4), 2);
        assert_eq!(index.line_of(9), 4);

        let four = text.find("four").unwrap();
        assert_eq!(index.range(four, text.len()), LineRange { from: 4, to: 4 });
        assert_eq!(index.range(0, text.len()), LineRange { from: 1, to: 4 });
    }
}
