//! Unified diff output.

use std::fmt::Write;

use weft_types::{Chunk, ChunkList};

/// Render a chunk list as a unified diff with `context` lines around each
/// change.
///
/// Changes closer than `2 * context` equal lines share a hunk. Only lines
/// identical on both sides are printed as context; an `equal` chunk that
/// matched under text filters has its differing lines written as removed
/// and added, so the patch applies to the unfiltered texts. Identical inputs
/// produce only the two header lines.
pub fn unified_diff(
    a_label: &str,
    b_label: &str,
    a: &[String],
    b: &[String],
    chunks: &ChunkList,
    context: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- {a_label}");
    let _ = writeln!(out, "+++ {b_label}");

    let list = chunks.chunks();
    for (first, last) in hunk_spans(list, context) {
        let mut hunk = Hunk::default();

        let lead = first
            .checked_sub(1)
            .map(|i| &list[i])
            .filter(|c| !c.is_change())
            .map_or(0, |c| common_suffix(&a[c.a.clone()], &b[c.b.clone()]).min(context));
        let start_a = list[first].a.start - lead;
        let start_b = list[first].b.start - lead;
        hunk.context(&a[start_a..list[first].a.start]);

        for chunk in &list[first..=last] {
            let (old, new) = (&a[chunk.a.clone()], &b[chunk.b.clone()]);
            if chunk.is_change() {
                hunk.change(old, new);
            } else {
                hunk.equal(old, new);
            }
        }

        if let Some(next) = list.get(last + 1).filter(|c| !c.is_change()) {
            let trail = common_prefix(&a[next.a.clone()], &b[next.b.clone()]).min(context);
            hunk.context(&a[next.a.start..next.a.start + trail]);
        }

        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            hunk_range(start_a, hunk.count_a),
            hunk_range(start_b, hunk.count_b)
        );
        out.push_str(&hunk.body);
    }
    out
}

#[derive(Default)]
struct Hunk {
    body: String,
    count_a: usize,
    count_b: usize,
}

impl Hunk {
    fn context(&mut self, lines: &[String]) {
        for line in lines {
            let _ = writeln!(self.body, " {line}");
        }
        self.count_a += lines.len();
        self.count_b += lines.len();
    }

    fn change(&mut self, old: &[String], new: &[String]) {
        for line in old {
            let _ = writeln!(self.body, "-{line}");
        }
        for line in new {
            let _ = writeln!(self.body, "+{line}");
        }
        self.count_a += old.len();
        self.count_b += new.len();
    }

    /// Lines matched under filters: identical ends stay context.
    fn equal(&mut self, old: &[String], new: &[String]) {
        let head = common_prefix(old, new);
        let tail = common_suffix(&old[head..], &new[head..]);
        self.context(&old[..head]);
        self.change(&old[head..old.len() - tail], &new[head..new.len() - tail]);
        self.context(&old[old.len() - tail..]);
    }
}

fn common_prefix(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[String], b: &[String]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

/// Index spans `(first, last)` of chunks forming one hunk each. Both ends
/// are changes.
fn hunk_spans(list: &[Chunk], context: usize) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (idx, chunk) in list.iter().enumerate() {
        if !chunk.is_change() {
            continue;
        }
        if let Some(span) = spans.last_mut() {
            let gap: usize = list[span.1 + 1..idx].iter().map(|c| c.a.len()).sum();
            if gap <= 2 * context {
                span.1 = idx;
                continue;
            }
        }
        spans.push((idx, idx));
    }
    spans
}

fn hunk_range(start: usize, count: usize) -> String {
    match count {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        n => format!("{},{n}", start + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::TextDiffer;
    use weft_types::DiffOptions;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn patch(a: &[String], b: &[String], context: usize) -> String {
        let list = TextDiffer::new(&DiffOptions::default()).unwrap().diff(a, b);
        unified_diff("a/file", "b/file", a, b, &list, context)
    }

    #[test]
    fn identical_has_headers_only() {
        let a = lines(&["x", "y"]);
        assert_eq!(patch(&a, &a, 3), "--- a/file\n+++ b/file\n");
    }

    #[test]
    fn single_replace_with_context() {
        let a = lines(&["1", "2", "3", "4", "5"]);
        let b = lines(&["1", "2", "X", "4", "5"]);
        assert_eq!(
            patch(&a, &b, 1),
            "--- a/file\n+++ b/file\n@@ -2,3 +2,3 @@\n 2\n-3\n+X\n 4\n"
        );
    }

    #[test]
    fn distant_changes_split_into_hunks() {
        let a = lines(&["a", "1", "2", "3", "4", "5", "b"]);
        let b = lines(&["A", "1", "2", "3", "4", "5", "B"]);
        let out = patch(&a, &b, 1);
        assert_eq!(out.matches("@@ ").count(), 2);
        assert!(out.contains("@@ -1,2 +1,2 @@\n-a\n+A\n 1\n"));
        assert!(out.contains("@@ -6,2 +6,2 @@\n 5\n-b\n+B\n"));
    }

    #[test]
    fn near_changes_share_a_hunk() {
        let a = lines(&["a", "1", "b"]);
        let b = lines(&["A", "1", "B"]);
        let out = patch(&a, &b, 1);
        assert_eq!(out.matches("@@ ").count(), 1);
        assert!(out.contains("@@ -1,3 +1,3 @@\n-a\n+A\n 1\n-b\n+B\n"));
    }

    /// Every hunk's old side must be a slice of `a` and its new side a
    /// slice of `b`, at the positions its header claims.
    fn assert_hunks_apply(patch: &str, a: &[String], b: &[String]) {
        let mut lines = patch.lines().skip(2).peekable();
        while let Some(header) = lines.next() {
            let ranges: Vec<(usize, usize)> = header
                .trim_matches(|c| c == '@' || c == ' ')
                .split(' ')
                .map(|r| {
                    let r = &r[1..];
                    let (start, len) = r.split_once(',').unwrap_or((r, "1"));
                    (start.parse().unwrap(), len.parse().unwrap())
                })
                .collect();
            let (mut old, mut new) = (Vec::new(), Vec::new());
            while let Some(line) = lines.next_if(|l| !l.starts_with("@@")) {
                let (mark, text) = line.split_at(1);
                if mark != "+" {
                    old.push(text.to_string());
                }
                if mark != "-" {
                    new.push(text.to_string());
                }
            }
            for ((start, len), (side, text)) in ranges.into_iter().zip([(a, old), (b, new)]) {
                let from = if len == 0 { start } else { start - 1 };
                assert_eq!(&side[from..from + len], text.as_slice(), "{patch}");
            }
        }
    }

    fn filtered_patch(a: &[String], b: &[String], context: usize) -> String {
        let opts = DiffOptions {
            ignore_blank_lines: true,
            ..Default::default()
        };
        let list = TextDiffer::new(&opts).unwrap().diff(a, b);
        unified_diff("a/file", "b/file", a, b, &list, context)
    }

    #[test]
    fn ignored_blank_line_is_not_context() {
        let a = lines(&["x", "", "y", "z"]);
        let b = lines(&["x", "y", "Z"]);
        let out = filtered_patch(&a, &b, 3);
        assert_eq!(out, "--- a/file\n+++ b/file\n@@ -3,2 +2,2 @@\n y\n-z\n+Z\n");
        assert_hunks_apply(&out, &a, &b);
    }

    #[test]
    fn filtered_equal_lines_inside_a_hunk_stay_consistent() {
        let a = lines(&["a", "k", "", "m", "b"]);
        let b = lines(&["A", "k", "m", "B"]);
        let out = filtered_patch(&a, &b, 2);
        assert_hunks_apply(&out, &a, &b);
        assert!(out.contains("\n-a\n+A\n"));
        assert!(out.contains("\n-b\n+B\n"));
    }

    #[test]
    fn unfiltered_patches_apply() {
        let a = lines(&["1", "2", "3", "4", "5", "6", "7", "8"]);
        let b = lines(&["1", "two", "3", "4", "5", "6", "8", "9"]);
        assert_hunks_apply(&patch(&a, &b, 1), &a, &b);
        assert_hunks_apply(&patch(&a, &b, 3), &a, &b);
    }

    #[test]
    fn pure_insertion_into_empty() {
        let a = lines(&[]);
        let b = lines(&["new"]);
        assert_eq!(patch(&a, &b, 3), "--- a/file\n+++ b/file\n@@ -0,0 +1 @@\n+new\n");
    }
}
