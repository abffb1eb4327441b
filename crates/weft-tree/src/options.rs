use serde::{Deserialize, Serialize};
use weft_types::DiffOptions;

/// Options for a tree comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Line comparison options; any loosening makes content comparison
    /// filtered.
    pub diff: DiffOptions,
    /// Match entry names case-sensitively.
    pub case_sensitive: bool,
    /// Treat files with equal size and modification time as probably same
    /// without reading them.
    pub shallow_comparison: bool,
    /// Modification times closer than this count as equal.
    pub time_resolution_ns: u64,
    /// Files above this size are not compared with text filters applied.
    pub max_filtered_size: u64,
    /// Report differing permission bits as an error on the entry.
    pub compare_permissions: bool,
    /// Descend through symbolic links; when off they are reported as errors.
    pub follow_symlinks: bool,
    /// Gitignore-style patterns for entries to leave out.
    pub excludes: Vec<String>,
    /// Attach a line diff to changed text files.
    pub file_diffs: bool,
    /// Merge directly adjacent conflicts in three-way file diffs.
    pub coalesce_adjacent_conflicts: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            diff: DiffOptions::default(),
            case_sensitive: true,
            shallow_comparison: false,
            time_resolution_ns: 100,
            max_filtered_size: 2 * 1024 * 1024,
            compare_permissions: false,
            follow_symlinks: true,
            excludes: default_excludes(),
            file_diffs: false,
            coalesce_adjacent_conflicts: true,
        }
    }
}

/// Backup files, OS metadata and version-control directories.
pub fn default_excludes() -> Vec<String> {
    [
        "#*#", ".#*", "~*", "*~", "*.orig", "*.bak", "*.swp", ".DS_Store", "._*",
        ".Spotlight-V100", ".Trashes", "Thumbs.db", "Desktop.ini", ".git", ".hg", ".bzr",
        ".svn", "CVS", "_darcs", "_MTN",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = TreeOptions::default();
        assert!(opts.case_sensitive);
        assert!(opts.follow_symlinks);
        assert!(!opts.shallow_comparison);
        assert!(opts.excludes.iter().any(|p| p == ".git"));
        assert!(opts.coalesce_adjacent_conflicts);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let opts: TreeOptions =
            serde_json::from_str(r#"{"shallow_comparison": true, "excludes": []}"#).unwrap();
        assert!(opts.shallow_comparison);
        assert!(opts.excludes.is_empty());
        assert_eq!(opts.time_resolution_ns, 100);
    }
}
