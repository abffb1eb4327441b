use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{TypeError, TypeResult};

/// Split text into lines.
///
/// Lines are separated by `\n`; a `\r` immediately before the separator is
/// dropped, and a final newline does not produce a trailing empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// An immutable, versioned list of lines.
///
/// Sequences are cheap to clone (the lines are shared) and never change once
/// built. Editing goes through [`Sequence::splice`], which returns a new
/// sequence whose version is one greater than its parent's.
#[derive(Clone, PartialEq, Eq)]
pub struct Sequence {
    lines: Arc<[String]>,
    version: u64,
}

impl Sequence {
    /// Create a sequence at version 0.
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into(),
            version: 0,
        }
    }

    /// Create a sequence from text, splitting it with [`split_lines`].
    pub fn from_text(text: &str) -> Self {
        Self::new(split_lines(text))
    }

    /// Create a sequence from raw bytes, replacing invalid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(bytes))
    }

    /// The same lines tagged with an explicit version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// The lines of this sequence.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the sequence has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Monotonic edit counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get a line by index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Borrow a sub-range of lines.
    pub fn slice(&self, range: Range<usize>) -> TypeResult<&[String]> {
        self.check_range(&range)?;
        Ok(&self.lines[range])
    }

    /// Replace `range` with `replacement`, returning the next version.
    pub fn splice(&self, range: Range<usize>, replacement: Vec<String>) -> TypeResult<Sequence> {
        self.check_range(&range)?;
        let mut lines = Vec::with_capacity(self.len() - range.len() + replacement.len());
        lines.extend_from_slice(&self.lines[..range.start]);
        lines.extend(replacement);
        lines.extend_from_slice(&self.lines[range.end..]);
        Ok(Self {
            lines: lines.into(),
            version: self.version + 1,
        })
    }

    /// BLAKE3 digest of the content (independent of the version).
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        for line in self.lines.iter() {
            hasher.update(&(line.len() as u64).to_le_bytes());
            hasher.update(line.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }

    /// Short hex form of [`fingerprint`](Self::fingerprint), for logs.
    pub fn short_fingerprint(&self) -> String {
        hex::encode(&self.fingerprint()[..4])
    }

    /// Join the lines back into text, newline-terminated.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in self.lines.iter() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn check_range(&self, range: &Range<usize>) -> TypeResult<()> {
        if range.start > range.end || range.end > self.len() {
            return Err(TypeError::InvalidRange {
                start: range.start,
                end: range.end,
                len: self.len(),
            });
        }
        Ok(())
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("lines", &self.len())
            .field("version", &self.version)
            .finish()
    }
}

impl From<Vec<&str>> for Sequence {
    fn from(lines: Vec<&str>) -> Self {
        Self::new(lines.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<String>> for Sequence {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}
