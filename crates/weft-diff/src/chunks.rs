//! Conversion of match blocks into coalesced chunk lists.

use weft_types::{Chunk, ChunkList, ChunkTag, MatchBlock};

/// Turn an ascending block list into a chunk list over `len_a` x `len_b`.
///
/// Gaps before each block become `replace`, `delete` or `insert` chunks,
/// blocks become `equal` chunks. Two empty sequences yield a single
/// `equal [0,0) [0,0)` chunk.
pub fn build_chunks(blocks: &[MatchBlock], len_a: usize, len_b: usize) -> ChunkList {
    let mut chunks: Vec<Chunk> = Vec::with_capacity(blocks.len() * 2);
    let (mut i, mut j) = (0usize, 0usize);

    for block in blocks {
        push_gap(&mut chunks, i..block.a, j..block.b);
        if block.len > 0 {
            push_coalesced(
                &mut chunks,
                Chunk::new(
                    ChunkTag::Equal,
                    block.a..block.a + block.len,
                    block.b..block.b + block.len,
                ),
            );
        }
        i = block.a + block.len;
        j = block.b + block.len;
    }
    push_gap(&mut chunks, i..len_a, j..len_b);

    if chunks.is_empty() {
        chunks.push(Chunk::new(ChunkTag::Equal, 0..0, 0..0));
    }

    let list = ChunkList::new(chunks, len_a, len_b);
    debug_assert!(list.validate().is_ok(), "{:?}", list.validate());
    list
}

/// One chunk covering both sequences entirely.
///
/// Used when matching gives up; the result is valid but says only that
/// something differs.
pub fn coarse_chunks(len_a: usize, len_b: usize) -> ChunkList {
    let tag = ChunkTag::for_gap(&(0..len_a), &(0..len_b)).unwrap_or(ChunkTag::Equal);
    ChunkList::new(vec![Chunk::new(tag, 0..len_a, 0..len_b)], len_a, len_b)
}

/// Merge neighbouring chunks so no two adjacent chunks are both equal or
/// both changes. Merged changes are re-tagged from their ranges.
pub fn coalesce(chunks: impl IntoIterator<Item = Chunk>) -> Vec<Chunk> {
    let mut out = Vec::new();
    for chunk in chunks {
        if chunk.a.is_empty() && chunk.b.is_empty() {
            continue;
        }
        push_coalesced(&mut out, chunk);
    }
    out
}

fn push_gap(chunks: &mut Vec<Chunk>, a: std::ops::Range<usize>, b: std::ops::Range<usize>) {
    if let Some(tag) = ChunkTag::for_gap(&a, &b) {
        push_coalesced(chunks, Chunk::new(tag, a, b));
    }
}

pub(crate) fn push_coalesced(chunks: &mut Vec<Chunk>, chunk: Chunk) {
    if let Some(last) = chunks.last_mut() {
        let touching = last.a.end == chunk.a.start && last.b.end == chunk.b.start;
        if touching && last.is_change() == chunk.is_change() {
            last.a.end = chunk.a.end;
            last.b.end = chunk.b.end;
            if last.is_change() {
                if let Some(tag) = ChunkTag::for_gap(&last.a, &last.b) {
                    last.tag = tag;
                }
            }
            return;
        }
    }
    chunks.push(chunk);
}
