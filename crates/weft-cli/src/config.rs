//! `weft.toml` handling.
//!
//! Every section is optional; missing keys keep their defaults. Command
//! line flags are applied on top of the file.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use weft_merge::MergeOptions;
use weft_tree::TreeOptions;
use weft_types::DiffOptions;

use crate::cli::FilterArgs;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSection {
    pub coalesce_adjacent_conflicts: bool,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            coalesce_adjacent_conflicts: MergeOptions::default().coalesce_adjacent_conflicts,
        }
    }
}

/// Contents of a configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line comparison, shared by every command.
    pub diff: DiffOptions,
    pub merge: MergeSection,
    /// Directory comparison; its `diff` and `coalesce_adjacent_conflicts`
    /// keys are replaced by `[diff]` and `[merge]`.
    pub tree: TreeOptions,
}

impl Config {
    /// Load `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply command line flags. Flags only ever loosen comparison.
    pub fn apply(&mut self, filters: &FilterArgs) {
        let diff = &mut self.diff;
        diff.ignore_blank_lines |= filters.ignore_blank_lines;
        if let Some(mode) = filters.ignore_whitespace {
            diff.ignore_whitespace = mode.into();
        }
        if filters.ignore_case {
            diff.case_sensitive = false;
        }
        if filters.no_autojunk {
            diff.autojunk = false;
        }
        diff.text_filters.extend(filters.text_filters.iter().cloned());
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            diff: self.diff.clone(),
            coalesce_adjacent_conflicts: self.merge.coalesce_adjacent_conflicts,
        }
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            diff: self.diff.clone(),
            coalesce_adjacent_conflicts: self.merge.coalesce_adjacent_conflicts,
            ..self.tree.clone()
        }
    }
}
