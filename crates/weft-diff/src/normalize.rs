//! Line normalisation applied before matching.
//!
//! A line's *key* is what takes part in equality: text filters removed,
//! whitespace trimmed or dropped, case folded. With blank-line filtering,
//! lines whose key is blank are left out of matching entirely and a map
//! back to the original indices is kept.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::Regex;
use weft_types::{DiffOptions, WhitespaceMode};

use crate::error::{DiffError, DiffResult};

/// Compiled form of the normalising parts of [`DiffOptions`].
#[derive(Clone, Debug)]
pub struct LineNormalizer {
    filters: Vec<Regex>,
    whitespace: WhitespaceMode,
    case_sensitive: bool,
    ignore_blank_lines: bool,
}

/// Keys of one side, plus the original index of each key when lines were
/// dropped.
#[derive(Debug)]
pub struct Prepared<'a> {
    pub keys: Vec<Cow<'a, str>>,
    pub map: Option<Vec<usize>>,
}

impl LineNormalizer {
    pub fn new(opts: &DiffOptions) -> DiffResult<Self> {
        let filters = opts
            .text_filters
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| DiffError::InvalidFilter {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<DiffResult<Vec<_>>>()?;

        Ok(Self {
            filters,
            whitespace: opts.ignore_whitespace,
            case_sensitive: opts.case_sensitive,
            ignore_blank_lines: opts.ignore_blank_lines,
        })
    }

    /// Returns `true` if keys are the lines themselves and nothing is dropped.
    pub fn is_identity(&self) -> bool {
        self.filters.is_empty()
            && self.whitespace == WhitespaceMode::None
            && self.case_sensitive
            && !self.ignore_blank_lines
    }

    /// The comparison key of a line.
    pub fn key<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut key = Cow::Borrowed(line);
        for filter in &self.filters {
            if filter.is_match(&key) {
                key = Cow::Owned(filter.replace_all(&key, "").into_owned());
            }
        }
        match self.whitespace {
            WhitespaceMode::None => {}
            WhitespaceMode::Trailing => {
                let trimmed = key.trim_end();
                if trimmed.len() != key.len() {
                    key = Cow::Owned(trimmed.to_owned());
                }
            }
            WhitespaceMode::All => {
                if key.chars().any(char::is_whitespace) {
                    key = Cow::Owned(key.chars().filter(|c| !c.is_whitespace()).collect());
                }
            }
        }
        if !self.case_sensitive {
            key = Cow::Owned(key.to_lowercase());
        }
        key
    }

    /// Whether a line is dropped before matching.
    pub fn is_dropped(&self, key: &str) -> bool {
        self.ignore_blank_lines && key.trim().is_empty()
    }

    /// Keys for all lines of one side.
    pub fn prepare<'a>(&self, lines: &'a [String]) -> Prepared<'a> {
        if self.is_identity() {
            return Prepared {
                keys: lines.iter().map(|l| Cow::Borrowed(l.as_str())).collect(),
                map: None,
            };
        }

        let mut keys = Vec::with_capacity(lines.len());
        let mut map = self.ignore_blank_lines.then(|| Vec::with_capacity(lines.len()));
        for (idx, line) in lines.iter().enumerate() {
            let key = self.key(line);
            if self.is_dropped(&key) {
                continue;
            }
            if let Some(map) = map.as_mut() {
                map.push(idx);
            }
            keys.push(key);
        }
        Prepared { keys, map }
    }

    /// Compare two line slices under this normaliser.
    pub fn lines_equal(&self, a: &[String], b: &[String]) -> bool {
        if a == b {
            return true;
        }
        if self.is_identity() {
            return false;
        }
        let left = self.prepare(a);
        let right = self.prepare(b);
        left.keys == right.keys
    }
}

/// Maps distinct keys to dense ids shared by both sides of one comparison.
#[derive(Debug, Default)]
pub struct Interner<'a> {
    ids: HashMap<Cow<'a, str>, u32>,
}

impl<'a> Interner<'a> {
    pub fn intern(&mut self, key: Cow<'a, str>) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(key).or_insert(next)
    }

    pub fn intern_all(&mut self, keys: Vec<Cow<'a, str>>) -> Vec<u32> {
        keys.into_iter().map(|k| self.intern(k)).collect()
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
