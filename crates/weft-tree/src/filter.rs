//! Name-based exclusion of entries.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::{TreeError, TreeResult};

/// Compiled exclude patterns.
#[derive(Debug)]
pub struct NameFilter {
    matcher: Gitignore,
}

impl NameFilter {
    pub fn new(patterns: &[String]) -> TreeResult<Self> {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| TreeError::Pattern(format!("{pattern}: {e}")))?;
        }
        let matcher = builder
            .build()
            .map_err(|e| TreeError::Pattern(e.to_string()))?;
        Ok(Self { matcher })
    }

    /// Returns `true` if the entry at relative `path` is excluded.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.matcher.matched(path, is_dir).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> NameFilter {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        NameFilter::new(&patterns).unwrap()
    }

    #[test]
    fn globs_match_names_at_any_depth() {
        let f = filter(&["*.bak", ".git"]);
        assert!(f.is_excluded(Path::new("notes.bak"), false));
        assert!(f.is_excluded(Path::new("src/old.bak"), false));
        assert!(f.is_excluded(Path::new("sub/.git"), true));
        assert!(!f.is_excluded(Path::new("src/main.rs"), false));
    }

    #[test]
    fn directory_only_patterns() {
        let f = filter(&["build/"]);
        assert!(f.is_excluded(Path::new("build"), true));
        assert!(!f.is_excluded(Path::new("build"), false));
    }

    #[test]
    fn negation_reincludes() {
        let f = filter(&["*.log", "!keep.log"]);
        assert!(f.is_excluded(Path::new("a.log"), false));
        assert!(!f.is_excluded(Path::new("keep.log"), false));
    }
}
