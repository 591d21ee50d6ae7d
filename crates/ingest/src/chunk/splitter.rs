//! Character-bounded splitter on top of the text-splitter crate.

use super::metadata::LineIndex;
use super::{Chunk, Locator};
use crate::error::IngestError;
use text_splitter::{ChunkConfig, TextSplitter};

/// Split `text` into ordered chunks of at most `max_chunk_size` characters.
///
/// Boundaries are chosen at the coarsest semantic level that fits: blank
/// lines, then line breaks, sentences, words, and finally single characters.
/// Surrounding whitespace is trimmed from each chunk and whitespace-only
/// segments are dropped, so only whitespace is ever lost.
///
/// Empty or whitespace-only text yields no chunks.
pub fn split(
    source_id: &str,
    text: &str,
    max_chunk_size: usize,
) -> Result<Vec<Chunk>, IngestError> {
    if max_chunk_size == 0 {
        return Err(IngestError::Split {
            source_id: source_id.to_string(),
            reason: "max chunk size must be greater than 0".to_string(),
        });
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let splitter = TextSplitter::new(ChunkConfig::new(max_chunk_size).with_trim(true));
    let lines = LineIndex::new(text);

    let mut chunks = Vec::new();
    for (offset, piece) in splitter.chunk_indices(text) {
        if piece.trim().is_empty() {
            continue;
        }

        let char_count = piece.chars().count();
        if char_count > max_chunk_size {
            return Err(IngestError::Split {
                source_id: source_id.to_string(),
                reason: format!(
                    "chunk at byte {} has {} characters, limit is {}",
                    offset, char_count, max_chunk_size
                ),
            });
        }

        let end = offset + piece.len();
        let locator = Locator {
            lines: lines.range(offset, end),
            byte_range: (offset, end),
        };
        chunks.push(Chunk::new(piece.to_string(), locator));
    }

    tracing::debug!(
        source_id,
        chunks = chunks.len(),
        bytes = text.len(),
        max_chunk_size,
        "Split document"
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::LineRange;

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(split("doc", "", 100).unwrap().is_empty());
        assert!(split("doc", "  \n\n \t", 100).unwrap().is_empty());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let result = split("doc", "text", 0);
        assert!(matches!(result, Err(IngestError::Split { .. })));
    }

    #[test]
    fn test_short_text_single_chunk() {
        let text = "Line 1\nLine 2\nLine 3";
        let chunks = split("doc", text, 1000).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].locator.lines, LineRange { from: 1, to: 3 });
        assert_eq!(chunks[0].locator.byte_range, (0, text.len()));
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = split("doc", text, 30).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "First paragraph here.");
        assert_eq!(chunks[1].text, "Second paragraph here.");
        assert_eq!(chunks[1].locator.lines, LineRange { from: 3, to: 3 });
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "a".repeat(25);
        let chunks = split("doc", &text, 10).unwrap();

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 10);
        }
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_size_bound_and_coverage() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(200)
            + "\n\nA closing paragraph with ünïcödé 🎮 characters.";
        let chunks = split("doc", &text, 100).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
            assert!(!chunk.text.trim().is_empty());
        }

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(non_whitespace(&joined), non_whitespace(&text));
    }

    #[test]
    fn test_locator_points_at_chunk_text() {
        let text = "alpha beta gamma\ndelta epsilon\n\nzeta eta theta iota kappa";
        let chunks = split("doc", text, 20).unwrap();

        for chunk in &chunks {
            let (start, end) = chunk.locator.byte_range;
            assert_eq!(&text[start..end], chunk.text);
            assert!(chunk.locator.lines.from <= chunk.locator.lines.to);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Sentence one. Sentence two! Sentence three?\n".repeat(50);
        let first = split("doc", &text, 120).unwrap();
        let second = split("doc", &text, 120).unwrap();
        assert_eq!(first, second);
    }
}
