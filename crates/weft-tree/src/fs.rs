//! Local filesystem source.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::source::{EntryKind, EntryMeta, TreeSource};

/// Reads trees from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSource;

impl TreeSource for FsSource {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = entry.map_err(io::Error::from)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        fs::symlink_metadata(path).map(|m| convert(&m))
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        fs::metadata(path).map(|m| convert(&m))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

fn convert(meta: &fs::Metadata) -> EntryMeta {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else {
        EntryKind::File
    };
    EntryMeta {
        kind,
        size: if kind == EntryKind::File { meta.len() } else { 0 },
        modified: meta.modified().ok(),
        mode: mode_bits(meta),
    }
}

#[cfg(unix)]
fn mode_bits(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn mode_bits(_meta: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "bee\n").unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();

        let source = FsSource;
        let mut names = source.list_dir(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "b.txt"]);

        let meta = source.symlink_metadata(&dir.path().join("b.txt")).unwrap();
        assert_eq!(meta.kind, EntryKind::File);
        assert_eq!(meta.size, 4);
        assert_eq!(source.metadata(&dir.path().join("a")).unwrap().kind, EntryKind::Dir);
        assert_eq!(source.read(&dir.path().join("b.txt")).unwrap(), b"bee\n");
    }

    #[test]
    fn missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FsSource.list_dir(&dir.path().join("nope")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed_by_symlink_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let link = dir.path().join("link");
        assert_eq!(FsSource.symlink_metadata(&link).unwrap().kind, EntryKind::Symlink);
        assert_eq!(FsSource.metadata(&link).unwrap().kind, EntryKind::Dir);
        assert_eq!(
            FsSource.canonicalize(&link).unwrap(),
            fs::canonicalize(dir.path().join("real")).unwrap()
        );
    }
}
