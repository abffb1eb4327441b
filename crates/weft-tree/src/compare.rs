//! Sameness of one matched set of entries.
//!
//! Cheap checks run first: kinds, then sizes and modification times, then
//! content hashes. Lines are only normalised and compared when text filters
//! are active and the bytes differ.

use std::path::Path;
use std::time::SystemTime;

use weft_diff::TextDiffer;
use weft_types::Sequence;

use crate::entry::EntryState;
use crate::options::TreeOptions;
use crate::source::{EntryKind, EntryMeta, TreeSource};

/// One side of a comparison: where to read it and what it looks like.
#[derive(Clone, Copy, Debug)]
pub struct Side<'a> {
    pub source: &'a dyn TreeSource,
    pub path: &'a Path,
    pub meta: &'a EntryMeta,
}

/// Outcome of comparing a set of entries.
#[derive(Debug)]
pub struct FileComparison {
    pub state: EntryState,
    /// Decoded contents, when comparison had to read them anyway.
    pub texts: Option<Vec<Sequence>>,
}

impl FileComparison {
    fn state(state: EntryState) -> Self {
        Self { state, texts: None }
    }
}

/// Classify entries present on every side.
pub fn compare_entries(sides: &[Side<'_>], opts: &TreeOptions, differ: &TextDiffer) -> FileComparison {
    let Some(first) = sides.first() else {
        return FileComparison::state(EntryState::Same);
    };
    if sides.iter().all(|s| s.meta.kind == EntryKind::Dir) {
        return FileComparison::state(EntryState::Same);
    }
    if sides.iter().any(|s| s.meta.kind != first.meta.kind) {
        return FileComparison::state(EntryState::Changed);
    }

    if opts.compare_permissions {
        let modes: Vec<Option<u32>> = sides.iter().map(|s| s.meta.mode).collect();
        if modes.iter().all(Option::is_some) && !all_equal(&modes) {
            let shown: Vec<String> = modes.iter().flatten().map(|m| format!("{m:o}")).collect();
            return FileComparison::state(EntryState::Error(format!(
                "permissions differ: {}",
                shown.join(" / ")
            )));
        }
    }

    let sizes: Vec<u64> = sides.iter().map(|s| s.meta.size).collect();
    let same_size = all_equal(&sizes);
    if opts.shallow_comparison && same_size && times_close(sides, opts.time_resolution_ns) {
        return FileComparison::state(EntryState::DodgySame);
    }

    let filtered = opts.diff.is_filtered();
    if !filtered && !same_size {
        return FileComparison::state(EntryState::Changed);
    }

    let contents = match read_all(sides) {
        Ok(contents) => contents,
        Err(reason) => return FileComparison::state(EntryState::Error(reason)),
    };
    let hashes: Vec<blake3::Hash> = contents.iter().map(|c| blake3::hash(c)).collect();
    if same_size && all_equal(&hashes) {
        return FileComparison::state(EntryState::Same);
    }

    if !filtered {
        return FileComparison {
            state: EntryState::Changed,
            texts: Some(decode(&contents)),
        };
    }
    if sizes.iter().any(|&s| s > opts.max_filtered_size) {
        return FileComparison::state(EntryState::DodgyDifferent);
    }

    let texts = decode(&contents);
    let same = texts[1..]
        .iter()
        .all(|t| differ.lines_equal(texts[0].lines(), t.lines()));
    FileComparison {
        state: if same {
            EntryState::SameFiltered
        } else {
            EntryState::Changed
        },
        texts: Some(texts),
    }
}

/// Read and decode every side, reporting the first failure as a message.
pub fn read_texts(sides: &[Side<'_>]) -> Result<Vec<Sequence>, String> {
    read_all(sides).map(|contents| decode(&contents))
}

fn read_all(sides: &[Side<'_>]) -> Result<Vec<Vec<u8>>, String> {
    sides
        .iter()
        .map(|s| {
            s.source
                .read(s.path)
                .map_err(|e| format!("{}: {e}", s.path.display()))
        })
        .collect()
}

fn decode(contents: &[Vec<u8>]) -> Vec<Sequence> {
    contents.iter().map(|c| Sequence::from_bytes(c)).collect()
}

fn all_equal<T: PartialEq>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] == w[1])
}

fn times_close(sides: &[Side<'_>], resolution_ns: u64) -> bool {
    let stamps: Option<Vec<u128>> = sides
        .iter()
        .map(|s| {
            s.meta
                .modified
                .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
        })
        .collect();
    match stamps {
        Some(stamps) => {
            let lo = stamps.iter().min().copied().unwrap_or(0);
            let hi = stamps.iter().max().copied().unwrap_or(0);
            hi - lo <= u128::from(resolution_ns)
        }
        None => false,
    }
}
