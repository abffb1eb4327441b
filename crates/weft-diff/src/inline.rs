//! Character-level changes inside replaced lines.
//!
//! Line chunks say *which* lines differ; for `replace` chunks it is useful
//! to know which characters differ as well. Lines are paired by position
//! within the chunk and compared with `similar`'s Myers diff.

use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::{DiffTag, TextDiff};
use weft_types::{Chunk, ChunkTag};

/// Per-pair time cap for the character diff.
const INLINE_TIMEOUT: Duration = Duration::from_millis(100);

/// A changed span within one line pair, in character offsets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineChange {
    pub tag: ChunkTag,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

/// Inline changes for one pair of lines inside a replace chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInline {
    pub a_line: usize,
    pub b_line: usize,
    pub changes: Vec<InlineChange>,
}

/// Character ranges that differ between two lines. Equal spans are omitted.
pub fn inline_diff(a: &str, b: &str) -> Vec<InlineChange> {
    let diff = TextDiff::configure()
        .timeout(INLINE_TIMEOUT)
        .diff_chars(a, b);

    diff.ops()
        .iter()
        .filter_map(|op| {
            let (tag, old, new) = op.as_tag_tuple();
            let tag = match tag {
                DiffTag::Equal => return None,
                DiffTag::Delete => ChunkTag::Delete,
                DiffTag::Insert => ChunkTag::Insert,
                DiffTag::Replace => ChunkTag::Replace,
            };
            Some(InlineChange { tag, a: old, b: new })
        })
        .collect()
}

/// Inline changes for every positional line pair of a replace chunk.
///
/// Other chunk kinds have no line pairs and yield nothing.
pub fn inline_chunk(a: &[String], b: &[String], chunk: &Chunk) -> Vec<LineInline> {
    if chunk.tag != ChunkTag::Replace {
        return Vec::new();
    }
    chunk
        .a
        .clone()
        .zip(chunk.b.clone())
        .filter_map(|(i, j)| {
            let (left, right) = (a.get(i)?, b.get(j)?);
            Some(LineInline {
                a_line: i,
                b_line: j,
                changes: inline_diff(left, right),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_character_replace() {
        let changes = inline_diff("hello world", "hello wOrld");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].a, 7..8);
        assert_eq!(changes[0].b, 7..8);
    }

    #[test]
    fn identical_lines_have_no_changes() {
        assert!(inline_diff("same", "same").is_empty());
    }

    #[test]
    fn appended_text_is_an_insert() {
        let changes = inline_diff("abc", "abcdef");
        assert_eq!(
            changes,
            vec![InlineChange {
                tag: ChunkTag::Insert,
                a: 3..3,
                b: 3..6,
            }]
        );
    }

    #[test]
    fn pairs_lines_by_position() {
        let a = vec!["x = 1".to_string(), "y = 2".to_string()];
        let b = vec!["x = 10".to_string()];
        let chunk = Chunk::new(ChunkTag::Replace, 0..2, 0..1);
        let pairs = inline_chunk(&a, &b, &chunk);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].a_line, pairs[0].b_line), (0, 0));
        assert!(!pairs[0].changes.is_empty());
    }

    #[test]
    fn non_replace_chunks_are_skipped() {
        let a = vec!["x".to_string()];
        let chunk = Chunk::new(ChunkTag::Delete, 0..1, 0..0);
        assert!(inline_chunk(&a, &[], &chunk).is_empty());
    }
}
