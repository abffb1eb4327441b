use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How whitespace takes part in line comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
    /// Whitespace is significant.
    #[default]
    None,
    /// Trailing whitespace is ignored.
    Trailing,
    /// All whitespace is ignored.
    All,
}

/// Upper bounds on the work a single sequence match may perform.
///
/// When a bound is hit the pair diff degrades to one coarse chunk instead of
/// running unbounded on adversarial input.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchLimits {
    /// Maximum number of inner-loop probes, or `None` for no limit.
    pub max_steps: Option<u64>,
    /// Wall-clock limit in milliseconds, or `None` for no limit.
    pub timeout_ms: Option<u64>,
}

impl MatchLimits {
    /// No limits at all.
    pub fn unbounded() -> Self {
        Self {
            max_steps: None,
            timeout_ms: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self {
            max_steps: Some(200_000_000),
            timeout_ms: None,
        }
    }
}

/// Options for comparing two line sequences.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Blank lines are dropped before matching and folded into neighbouring chunks.
    pub ignore_blank_lines: bool,
    /// Whitespace handling for line equality.
    pub ignore_whitespace: WhitespaceMode,
    /// When `false`, lines are compared case-insensitively.
    pub case_sensitive: bool,
    /// Drop overly frequent elements of the second sequence from the match
    /// index. This changes the output on inputs dominated by one repeated
    /// line, in exchange for bounded running time.
    pub autojunk: bool,
    /// Regular expressions whose matches are removed from each line before
    /// comparison.
    pub text_filters: Vec<String>,
    /// Work limits for the matcher.
    pub limits: MatchLimits,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_blank_lines: false,
            ignore_whitespace: WhitespaceMode::None,
            case_sensitive: true,
            autojunk: true,
            text_filters: Vec::new(),
            limits: MatchLimits::default(),
        }
    }
}

impl DiffOptions {
    /// Returns `true` if any option makes line equality looser than byte equality.
    pub fn is_filtered(&self) -> bool {
        self.ignore_blank_lines
            || self.ignore_whitespace != WhitespaceMode::None
            || !self.case_sensitive
            || !self.text_filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = DiffOptions::default();
        assert!(!opts.ignore_blank_lines);
        assert_eq!(opts.ignore_whitespace, WhitespaceMode::None);
        assert!(opts.case_sensitive);
        assert!(opts.autojunk);
        assert!(!opts.is_filtered());
        assert_eq!(opts.limits.max_steps, Some(200_000_000));
    }

    #[test]
    fn any_loosening_counts_as_filtered() {
        let opts = DiffOptions {
            case_sensitive: false,
            ..Default::default()
        };
        assert!(opts.is_filtered());

        let opts = DiffOptions {
            text_filters: vec![r"\$Id.*\$".into()],
            ..Default::default()
        };
        assert!(opts.is_filtered());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let opts: DiffOptions =
            serde_json::from_str(r#"{"ignore_whitespace": "trailing", "limits": {"timeout_ms": 50}}"#)
                .unwrap();
        assert_eq!(opts.ignore_whitespace, WhitespaceMode::Trailing);
        assert!(opts.autojunk);
        assert_eq!(opts.limits.timeout(), Some(Duration::from_millis(50)));
        assert_eq!(opts.limits.max_steps, Some(200_000_000));
    }
}
