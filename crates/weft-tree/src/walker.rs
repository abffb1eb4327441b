//! Lock-step walk over two or three trees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};
use weft_diff::TextDiffer;
use weft_merge::{MergeOptions, ThreeWayMerger};
use weft_types::{CancelToken, Sequence};

use crate::compare::{compare_entries, read_texts, Side};
use crate::entry::{EntryState, FileDiff, TreeEntry};
use crate::error::{TreeError, TreeResult};
use crate::filter::NameFilter;
use crate::options::TreeOptions;
use crate::source::{EntryKind, EntryMeta, TreeRoot};

/// What stat-ing one side of an entry found.
#[derive(Debug)]
enum Probe {
    Missing,
    Found(EntryMeta),
    Failed(EntryKind, String),
}

impl Probe {
    fn kind(&self) -> EntryKind {
        match self {
            Probe::Missing => EntryKind::Missing,
            Probe::Found(meta) => meta.kind,
            Probe::Failed(kind, _) => *kind,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Probe::Found(meta) if meta.kind == EntryKind::Dir)
    }
}

/// Compares two or three roots entry by entry.
#[derive(Debug)]
pub struct TreeDiffer<'r> {
    roots: &'r [TreeRoot],
    opts: &'r TreeOptions,
    differ: TextDiffer,
    merger: Option<ThreeWayMerger>,
    filter: NameFilter,
}

impl<'r> TreeDiffer<'r> {
    pub fn new(roots: &'r [TreeRoot], opts: &'r TreeOptions) -> TreeResult<Self> {
        if !(2..=3).contains(&roots.len()) {
            return Err(TreeError::RootCount(roots.len()));
        }
        let merger = if roots.len() == 3 {
            Some(ThreeWayMerger::new(&MergeOptions {
                diff: opts.diff.clone(),
                coalesce_adjacent_conflicts: opts.coalesce_adjacent_conflicts,
            })?)
        } else {
            None
        };
        Ok(Self {
            roots,
            opts,
            differ: TextDiffer::new(&opts.diff)?,
            merger,
            filter: NameFilter::new(&opts.excludes)?,
        })
    }

    /// Walk all roots. `on_entry` sees every entry once it is complete,
    /// children before their parent.
    pub fn run(
        &self,
        cancel: &CancelToken,
        on_entry: &mut dyn FnMut(&TreeEntry),
    ) -> TreeResult<TreeEntry> {
        let started = Instant::now();
        let paths: Vec<Option<PathBuf>> = self.roots.iter().map(|r| Some(r.path.clone())).collect();
        let mut guards: Vec<Vec<PathBuf>> = vec![Vec::new(); self.roots.len()];

        let root = self
            .visit(String::new(), PathBuf::new(), &paths, &mut guards, cancel, on_entry)?
            .unwrap_or_else(|| TreeEntry::new("", "", vec![EntryKind::Dir; self.roots.len()]));

        info!(
            roots = self.roots.len(),
            entries = root.iter().count(),
            differing = root.differing().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tree comparison finished"
        );
        Ok(root)
    }

    fn visit(
        &self,
        name: String,
        rel: PathBuf,
        paths: &[Option<PathBuf>],
        guards: &mut Vec<Vec<PathBuf>>,
        cancel: &CancelToken,
        on_entry: &mut dyn FnMut(&TreeEntry),
    ) -> TreeResult<Option<TreeEntry>> {
        if cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let probes: Vec<Probe> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| match path {
                Some(path) => self.probe(i, path),
                None => Probe::Missing,
            })
            .collect();

        let is_dir = probes.iter().any(Probe::is_dir);
        if !rel.as_os_str().is_empty() && self.filter.is_excluded(&rel, is_dir) {
            debug!(path = %rel.display(), "excluded");
            return Ok(None);
        }

        let mut entry = TreeEntry::new(name, rel.clone(), probes.iter().map(Probe::kind).collect());
        let failures: Vec<&str> = probes
            .iter()
            .filter_map(|p| match p {
                Probe::Failed(_, reason) => Some(reason.as_str()),
                _ => None,
            })
            .collect();
        let present: Vec<bool> = probes.iter().map(|p| !matches!(p, Probe::Missing)).collect();

        if !failures.is_empty() {
            entry.state = EntryState::Error(failures.join("; "));
        } else if is_dir && probes.iter().all(|p| p.is_dir() || matches!(p, Probe::Missing)) {
            match self.children(&rel, paths, &probes, guards, cancel, on_entry)? {
                Ok(children) => {
                    entry.state = if present.iter().all(|&p| p) {
                        if children.iter().all(|c| c.state.is_same_like()) {
                            EntryState::Same
                        } else {
                            EntryState::Changed
                        }
                    } else {
                        presence_state(&present)
                    };
                    entry.children = children;
                }
                Err(reason) => entry.state = EntryState::Error(reason),
            }
        } else if present.iter().all(|&p| p) {
            self.compare(&mut entry, paths, &probes);
        } else {
            entry.state = presence_state(&present);
        }

        if let EntryState::Error(reason) = &entry.state {
            warn!(path = %rel.display(), reason = %reason, "entry could not be compared");
        }
        on_entry(&entry);
        Ok(Some(entry))
    }

    fn probe(&self, side: usize, path: &Path) -> Probe {
        let source = &self.roots[side].source;
        let meta = match source.symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) => return Probe::Failed(EntryKind::Missing, format!("{}: {e}", path.display())),
        };
        if meta.kind != EntryKind::Symlink {
            return Probe::Found(meta);
        }
        if !self.opts.follow_symlinks {
            return Probe::Failed(
                EntryKind::Symlink,
                format!("{}: symbolic link not followed", path.display()),
            );
        }
        match source.metadata(path) {
            Ok(target) => Probe::Found(target),
            Err(e) => Probe::Failed(
                EntryKind::Symlink,
                format!("{}: broken symbolic link: {e}", path.display()),
            ),
        }
    }

    /// Matched children of a directory present as a directory on at least
    /// one side. The outer error aborts the walk; the inner one marks only
    /// this entry.
    #[allow(clippy::type_complexity)]
    fn children(
        &self,
        rel: &Path,
        paths: &[Option<PathBuf>],
        probes: &[Probe],
        guards: &mut Vec<Vec<PathBuf>>,
        cancel: &CancelToken,
        on_entry: &mut dyn FnMut(&TreeEntry),
    ) -> TreeResult<Result<Vec<TreeEntry>, String>> {
        let sides = self.roots.len();
        let mut names: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();
        // Names folded onto one already taken on the same side.
        let mut hidden: Vec<(usize, String)> = Vec::new();
        let mut entered: Vec<(usize, PathBuf)> = Vec::new();

        for (i, path) in paths.iter().enumerate() {
            let Some(path) = path.as_ref().filter(|_| probes[i].is_dir()) else {
                continue;
            };
            let source = &self.roots[i].source;
            let canonical = match source.canonicalize(path) {
                Ok(canonical) => canonical,
                Err(e) => return Ok(Err(format!("{}: {e}", path.display()))),
            };
            if guards[i].contains(&canonical) {
                return Ok(Err(format!("{}: symbolic link cycle", path.display())));
            }
            let listed = match source.list_dir(path) {
                Ok(listed) => listed,
                Err(e) => return Ok(Err(format!("{}: {e}", path.display()))),
            };
            for child in listed {
                let key = if self.opts.case_sensitive {
                    child.clone()
                } else {
                    child.to_lowercase()
                };
                let slot = &mut names.entry(key).or_insert_with(|| vec![None; sides])[i];
                if slot.is_some() {
                    hidden.push((i, child));
                } else {
                    *slot = Some(child);
                }
            }
            entered.push((i, canonical));
        }

        for (i, canonical) in &entered {
            guards[*i].push(canonical.clone());
        }
        let mut children = Vec::with_capacity(names.len());
        let mut outcome = Ok(());
        for actual in names.into_values() {
            let display = actual.iter().flatten().next().cloned().unwrap_or_default();
            let child_paths: Vec<Option<PathBuf>> = actual
                .iter()
                .zip(paths)
                .map(|(name, dir)| Some(dir.as_ref()?.join(name.as_ref()?)))
                .collect();
            match self.visit(display.clone(), rel.join(&display), &child_paths, guards, cancel, on_entry) {
                Ok(Some(child)) => children.push(child),
                Ok(None) => {}
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        for (i, _) in &entered {
            guards[*i].pop();
        }
        outcome?;

        if !hidden.is_empty() {
            for (i, name) in hidden {
                if let Some(child) = self.hidden_entry(rel, paths, i, name) {
                    on_entry(&child);
                    children.push(child);
                }
            }
            children.sort_by(|x, y| {
                x.name
                    .to_lowercase()
                    .cmp(&y.name.to_lowercase())
                    .then_with(|| x.name.cmp(&y.name))
            });
        }
        Ok(Ok(children))
    }

    /// An entry shadowed on side `side` by another name equal up to case.
    fn hidden_entry(
        &self,
        rel: &Path,
        paths: &[Option<PathBuf>],
        side: usize,
        name: String,
    ) -> Option<TreeEntry> {
        let path = paths[side].as_ref()?.join(&name);
        let probe = self.probe(side, &path);
        let child_rel = rel.join(&name);
        if self.filter.is_excluded(&child_rel, probe.is_dir()) {
            return None;
        }
        let mut kinds = vec![EntryKind::Missing; paths.len()];
        kinds[side] = probe.kind();
        let mut entry = TreeEntry::new(name, child_rel, kinds);
        let reason = format!("{}: hidden by case-insensitive comparison", path.display());
        warn!(path = %entry.path.display(), "entry hidden by case-insensitive comparison");
        entry.state = EntryState::Error(reason);
        Some(entry)
    }

    /// Compare entries present on every side that are not all directories.
    fn compare(&self, entry: &mut TreeEntry, paths: &[Option<PathBuf>], probes: &[Probe]) {
        let sides: Vec<Side<'_>> = paths
            .iter()
            .zip(probes)
            .enumerate()
            .filter_map(|(i, (path, probe))| match (path, probe) {
                (Some(path), Probe::Found(meta)) => Some(Side {
                    source: self.roots[i].source.as_ref(),
                    path,
                    meta,
                }),
                _ => None,
            })
            .collect();

        let result = compare_entries(&sides, self.opts, &self.differ);
        entry.state = result.state;
        let all_files = sides.iter().all(|s| s.meta.kind == EntryKind::File);
        if self.opts.file_diffs && entry.state == EntryState::Changed && all_files {
            let texts = match result.texts {
                Some(texts) => Some(texts),
                None => match read_texts(&sides) {
                    Ok(texts) => Some(texts),
                    Err(e) => {
                        warn!(path = %entry.path.display(), error = %e, "could not read files for a line diff");
                        None
                    }
                },
            };
            entry.diff = texts.and_then(|t| self.file_diff(&t));
        }
    }

    fn file_diff(&self, texts: &[Sequence]) -> Option<FileDiff> {
        match texts {
            [left, right] => Some(FileDiff::Pair(self.differ.diff(left.lines(), right.lines()))),
            [left, middle, right] => Some(FileDiff::Triple(self.merger.as_ref()?.merge(
                middle.lines(),
                left.lines(),
                right.lines(),
            ))),
            _ => None,
        }
    }
}

/// State of an entry missing from some sides.
fn presence_state(present: &[bool]) -> EntryState {
    match present {
        [true, false] | [true, false, false] => EntryState::NewLeft,
        [false, true] | [false, false, true] => EntryState::NewRight,
        [true, false, true] => EntryState::NewOther,
        _ => EntryState::Deleted,
    }
}

/// Compare two or three trees.
pub fn diff_tree(roots: &[TreeRoot], opts: &TreeOptions) -> TreeResult<TreeEntry> {
    TreeDiffer::new(roots, opts)?.run(&CancelToken::new(), &mut |_| {})
}
