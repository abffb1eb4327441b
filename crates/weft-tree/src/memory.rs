//! In-memory tree source.
//!
//! Useful for testing and for comparing synthetic trees. Paths are relative
//! to the tree root (the empty path); symlink targets are paths within the
//! same tree.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::source::{EntryKind, EntryMeta, TreeSource};

/// Symlink hops allowed while resolving one path.
const MAX_LINK_HOPS: usize = 40;

#[derive(Clone, Debug)]
enum Node {
    File {
        data: Vec<u8>,
        modified: SystemTime,
        mode: u32,
    },
    Dir,
    Symlink(PathBuf),
    /// Any access fails with `PermissionDenied`.
    Denied,
}

/// A tree held entirely in memory, built with chained calls.
#[derive(Clone, Debug)]
pub struct InMemoryTree {
    nodes: BTreeMap<PathBuf, Node>,
}

impl Default for InMemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTree {
    /// An empty tree: just the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::new(), Node::Dir);
        Self { nodes }
    }

    /// Add a file, creating parent directories.
    pub fn file(mut self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.ensure_parents(&path);
        self.nodes.insert(
            path,
            Node::File {
                data: data.into(),
                modified: SystemTime::UNIX_EPOCH,
                mode: 0o644,
            },
        );
        self
    }

    /// Add an empty directory, creating parents.
    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.ensure_parents(&path);
        self.nodes.insert(path, Node::Dir);
        self
    }

    /// Add a symlink pointing at `target`, a path within this tree.
    pub fn symlink(mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.ensure_parents(&path);
        self.nodes
            .insert(path, Node::Symlink(target.as_ref().to_path_buf()));
        self
    }

    /// Add an entry that cannot be read or listed.
    pub fn denied(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.ensure_parents(&path);
        self.nodes.insert(path, Node::Denied);
        self
    }

    /// Set the modification time of a file, as seconds and nanoseconds
    /// past the epoch.
    pub fn modified(mut self, path: impl AsRef<Path>, secs: u64, nanos: u32) -> Self {
        if let Some(Node::File { modified, .. }) = self.nodes.get_mut(path.as_ref()) {
            *modified = SystemTime::UNIX_EPOCH + Duration::new(secs, nanos);
        }
        self
    }

    /// Set the permission bits of a file.
    pub fn mode(mut self, path: impl AsRef<Path>, bits: u32) -> Self {
        if let Some(Node::File { mode, .. }) = self.nodes.get_mut(path.as_ref()) {
            *mode = bits;
        }
        self
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            self.nodes.entry(dir.to_path_buf()).or_insert(Node::Dir);
            parent = dir.parent();
        }
    }

    /// Resolve symlinks along `path`; the final component only when
    /// `follow_last` is set.
    fn resolve(&self, path: &Path, follow_last: bool) -> io::Result<PathBuf> {
        let mut pending: Vec<PathBuf> = components(path).into_iter().rev().collect();
        let mut resolved = PathBuf::new();
        let mut hops = 0;

        while let Some(part) = pending.pop() {
            let candidate = resolved.join(&part);
            let is_last = pending.is_empty();
            match self.nodes.get(&candidate) {
                Some(Node::Symlink(target)) if follow_last || !is_last => {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(io::Error::new(
                            io::ErrorKind::Other,
                            "too many levels of symbolic links",
                        ));
                    }
                    pending.extend(components(target).into_iter().rev());
                    resolved = PathBuf::new();
                }
                Some(Node::Denied) if !is_last => return Err(denied(&candidate)),
                Some(_) => resolved = candidate,
                None => return Err(not_found(&candidate)),
            }
        }
        Ok(resolved)
    }

    fn node(&self, path: &Path, follow_last: bool) -> io::Result<(PathBuf, &Node)> {
        let resolved = self.resolve(path, follow_last)?;
        let node = self.nodes.get(&resolved).ok_or_else(|| not_found(&resolved))?;
        Ok((resolved, node))
    }
}

impl TreeSource for InMemoryTree {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let (resolved, node) = self.node(path, true)?;
        match node {
            Node::Dir => Ok(self
                .nodes
                .keys()
                .filter(|k| k.as_path() != resolved && k.parent() == Some(resolved.as_path()))
                .filter_map(|k| k.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect()),
            Node::Denied => Err(denied(&resolved)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", resolved.display()),
            )),
        }
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        let (resolved, node) = self.node(path, false)?;
        meta_of(&resolved, node)
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        let (resolved, node) = self.node(path, true)?;
        meta_of(&resolved, node)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let (resolved, node) = self.node(path, true)?;
        match node {
            Node::File { data, .. } => Ok(data.clone()),
            Node::Denied => Err(denied(&resolved)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", resolved.display()),
            )),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.resolve(path, true)
    }
}

fn meta_of(path: &Path, node: &Node) -> io::Result<EntryMeta> {
    Ok(match node {
        Node::File {
            data,
            modified,
            mode,
        } => EntryMeta {
            kind: EntryKind::File,
            size: data.len() as u64,
            modified: Some(*modified),
            mode: Some(*mode),
        },
        Node::Dir => EntryMeta::dir(),
        Node::Symlink(_) => EntryMeta {
            kind: EntryKind::Symlink,
            size: 0,
            modified: None,
            mode: None,
        },
        Node::Denied => return Err(denied(path)),
    })
}

fn components(path: &Path) -> Vec<PathBuf> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(PathBuf::from(name)),
            _ => None,
        })
        .collect()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("permission denied: {}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_parents_and_lists() {
        let tree = InMemoryTree::new().file("a/b/c.txt", "c").file("a/d.txt", "d");
        let mut names = tree.list_dir(Path::new("a")).unwrap();
        names.sort();
        assert_eq!(names, vec!["b", "d.txt"]);
        assert_eq!(tree.list_dir(Path::new("")).unwrap(), vec!["a"]);
        assert_eq!(tree.read(Path::new("a/b/c.txt")).unwrap(), b"c");
    }

    #[test]
    fn symlinks_resolve() {
        let tree = InMemoryTree::new()
            .file("real/f.txt", "x")
            .symlink("link", "real");
        assert_eq!(
            tree.symlink_metadata(Path::new("link")).unwrap().kind,
            EntryKind::Symlink
        );
        assert_eq!(tree.metadata(Path::new("link")).unwrap().kind, EntryKind::Dir);
        assert_eq!(tree.read(Path::new("link/f.txt")).unwrap(), b"x");
        assert_eq!(
            tree.canonicalize(Path::new("link/f.txt")).unwrap(),
            PathBuf::from("real/f.txt")
        );
    }

    #[test]
    fn symlink_loops_error_out() {
        let tree = InMemoryTree::new().symlink("x", "y").symlink("y", "x");
        assert!(tree.metadata(Path::new("x")).is_err());
    }

    #[test]
    fn denied_entries_error() {
        let tree = InMemoryTree::new().denied("secret");
        let err = tree.list_dir(Path::new("secret")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(tree.read(Path::new("secret")).is_err());
    }

    #[test]
    fn metadata_setters() {
        let tree = InMemoryTree::new()
            .file("f", "12345")
            .modified("f", 10, 5)
            .mode("f", 0o755);
        let meta = tree.metadata(Path::new("f")).unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(meta.mode, Some(0o755));
        assert_eq!(
            meta.modified,
            Some(SystemTime::UNIX_EPOCH + Duration::new(10, 5))
        );
    }
}
