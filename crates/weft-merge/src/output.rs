//! Merged text and conflict markers.

use serde::{Deserialize, Serialize};
use weft_types::RegionTag;

use crate::error::{MergeError, Result};
use crate::merger::MergeResult;

/// Labels printed after the conflict markers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerLabels {
    pub a: String,
    pub ancestor: String,
    pub b: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self {
            a: "a".into(),
            ancestor: "base".into(),
            b: "b".into(),
        }
    }
}

impl MergeResult {
    /// The merged lines, or [`MergeError::Unresolved`] if any region is in
    /// conflict.
    ///
    /// Unchanged and identically changed regions are taken from `a`.
    pub fn merged(&self, a: &[String], b: &[String]) -> Result<Vec<String>> {
        let conflicts = self.conflict_count();
        if conflicts > 0 {
            return Err(MergeError::Unresolved { conflicts });
        }
        let mut out = Vec::with_capacity(self.len_of(weft_types::MergeSide::A));
        for region in self.regions() {
            match region.tag {
                RegionTag::ChangedB => out.extend_from_slice(&b[region.b.clone()]),
                _ => out.extend_from_slice(&a[region.a.clone()]),
            }
        }
        Ok(out)
    }

    /// The merged text with every conflict written out diff3-style:
    ///
    /// ```text
    /// <<<<<<< a
    /// ...side a...
    /// ||||||| base
    /// ...ancestor...
    /// =======
    /// ...side b...
    /// >>>>>>> b
    /// ```
    pub fn render_with_markers(
        &self,
        ancestor: &[String],
        a: &[String],
        b: &[String],
        labels: &MarkerLabels,
    ) -> String {
        let mut out = String::new();
        for region in self.regions() {
            match region.tag {
                RegionTag::Conflict => {
                    push_line(&mut out, &format!("<<<<<<< {}", labels.a));
                    push_lines(&mut out, &a[region.a.clone()]);
                    push_line(&mut out, &format!("||||||| {}", labels.ancestor));
                    push_lines(&mut out, &ancestor[region.ancestor.clone()]);
                    push_line(&mut out, "=======");
                    push_lines(&mut out, &b[region.b.clone()]);
                    push_line(&mut out, &format!(">>>>>>> {}", labels.b));
                }
                RegionTag::ChangedB => push_lines(&mut out, &b[region.b.clone()]),
                _ => push_lines(&mut out, &a[region.a.clone()]),
            }
        }
        out
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_lines(out: &mut String, lines: &[String]) {
    for line in lines {
        push_line(out, line);
    }
}
