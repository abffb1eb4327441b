//! Memoised pair diffs.
//!
//! Repeatedly re-diffing the same pair of texts (for example while a file
//! pair is re-shown after an unrelated edit) is common. [`CachedMatcher`]
//! keys results on the content fingerprints of both sides and evicts least
//! recently used entries when asked to [`clean`](CachedMatcher::clean).

use std::collections::HashMap;

use tracing::debug;
use weft_types::{ChunkList, DiffOptions, Sequence};

use crate::error::DiffResult;
use crate::pair::TextDiffer;

#[derive(Debug)]
struct CacheEntry {
    chunks: ChunkList,
    last_used: u64,
}

/// A [`TextDiffer`] with a result cache.
#[derive(Debug)]
pub struct CachedMatcher {
    differ: TextDiffer,
    entries: HashMap<[u8; 32], CacheEntry>,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl CachedMatcher {
    pub fn new(opts: &DiffOptions) -> DiffResult<Self> {
        Ok(Self {
            differ: TextDiffer::new(opts)?,
            entries: HashMap::new(),
            clock: 0,
            hits: 0,
            misses: 0,
        })
    }

    /// Diff two sequences, reusing a previous result for the same contents.
    pub fn diff(&mut self, a: &Sequence, b: &Sequence) -> ChunkList {
        self.clock += 1;
        let key = pair_key(a, b);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = self.clock;
            self.hits += 1;
            return entry.chunks.clone();
        }

        self.misses += 1;
        let chunks = self.differ.diff(a.lines(), b.lines());
        debug!(
            a = %a.short_fingerprint(),
            b = %b.short_fingerprint(),
            chunks = chunks.len(),
            "diff cache miss"
        );
        self.entries.insert(
            key,
            CacheEntry {
                chunks: chunks.clone(),
                last_used: self.clock,
            },
        );
        chunks
    }

    /// Drop older entries once the cache holds more than three times
    /// `size_hint`, keeping the `2 * size_hint` most recently used.
    pub fn clean(&mut self, size_hint: usize) {
        if self.entries.len() <= size_hint.saturating_mul(3) {
            return;
        }
        let keep = size_hint.saturating_mul(2);
        let mut stamps: Vec<u64> = self.entries.values().map(|e| e.last_used).collect();
        stamps.sort_unstable_by(|x, y| y.cmp(x));
        let cutoff = stamps.get(keep).copied().unwrap_or(0);

        let before = self.entries.len();
        self.entries.retain(|_, e| e.last_used > cutoff);
        debug!(before, after = self.entries.len(), size_hint, "diff cache cleaned");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

fn pair_key(a: &Sequence, b: &Sequence) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&a.fingerprint());
    hasher.update(&b.fingerprint());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[&str]) -> Sequence {
        Sequence::from(items.to_vec())
    }

    #[test]
    fn repeated_pair_hits_cache() {
        let mut cache = CachedMatcher::new(&DiffOptions::default()).unwrap();
        let (a, b) = (seq(&["a", "b"]), seq(&["a", "c"]));
        let first = cache.diff(&a, &b);
        let second = cache.diff(&a, &b);
        assert_eq!(first, second);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn sides_are_ordered() {
        let mut cache = CachedMatcher::new(&DiffOptions::default()).unwrap();
        let (a, b) = (seq(&["a"]), seq(&["b", "a"]));
        cache.diff(&a, &b);
        cache.diff(&b, &a);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_content_new_version_still_hits() {
        let mut cache = CachedMatcher::new(&DiffOptions::default()).unwrap();
        let a = seq(&["x"]);
        let b = seq(&["y"]);
        cache.diff(&a, &b);
        cache.diff(&a.clone().with_version(9), &b);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn clean_keeps_most_recent() {
        let mut cache = CachedMatcher::new(&DiffOptions::default()).unwrap();
        let base = seq(&["base"]);
        let others: Vec<Sequence> = (0..7).map(|i| Sequence::from(vec![format!("l{i}")])).collect();
        for other in &others {
            cache.diff(&base, other);
        }
        // Nothing is dropped until the cache exceeds three times the hint.
        cache.clean(3);
        assert_eq!(cache.len(), 7);

        cache.clean(2);
        assert_eq!(cache.len(), 4);
        let misses = cache.misses();
        cache.diff(&base, &others[6]);
        cache.diff(&base, &others[3]);
        assert_eq!(cache.misses(), misses);
        cache.diff(&base, &others[0]);
        assert_eq!(cache.misses(), misses + 1);
    }
}
