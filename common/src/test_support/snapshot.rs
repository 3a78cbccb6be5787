//! Before/after directory snapshots.
//!
//! A [`DirSnapshot`] records every entry under a root together with file
//! contents, so tests can assert that an operation left a tree untouched or
//! changed exactly the paths they expect.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A captured entry below the snapshot root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotEntry {
    /// A directory.
    Directory,
    /// A regular file and its contents.
    File(Vec<u8>),
}

/// Recursive listing of a directory tree keyed by relative path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirSnapshot {
    entries: BTreeMap<PathBuf, SnapshotEntry>,
}

/// Paths that differ between two snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Present only in the later snapshot.
    pub added: Vec<PathBuf>,
    /// Present only in the earlier snapshot.
    pub removed: Vec<PathBuf>,
    /// Present in both with different kind or contents.
    pub changed: Vec<PathBuf>,
}

impl SnapshotDiff {
    /// Returns `true` when the snapshots were identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl DirSnapshot {
    /// Captures `root`. A missing root yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while walking the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone_common::test_support::DirSnapshot;
    /// use std::fs;
    /// use tempfile::tempdir;
    ///
    /// # fn demo() -> std::io::Result<()> {
    /// let root = tempdir()?;
    /// let before = DirSnapshot::capture(root.path())?;
    /// fs::write(root.path().join("new.txt"), "x")?;
    /// let after = DirSnapshot::capture(root.path())?;
    /// assert_eq!(before.diff(&after).added.len(), 1);
    /// # Ok(())
    /// # }
    /// # demo().unwrap();
    /// ```
    pub fn capture(root: &Path) -> io::Result<Self> {
        let mut entries = BTreeMap::new();
        if root.exists() {
            walk(root, root, &mut entries)?;
        }
        Ok(Self { entries })
    }

    /// Number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when `relative` was captured.
    #[must_use]
    pub fn contains(&self, relative: impl AsRef<Path>) -> bool {
        self.entries.contains_key(relative.as_ref())
    }

    /// Compares this snapshot (before) with `later` (after).
    #[must_use]
    pub fn diff(&self, later: &Self) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for (path, entry) in &self.entries {
            match later.entries.get(path) {
                None => diff.removed.push(path.clone()),
                Some(other) if other != entry => diff.changed.push(path.clone()),
                Some(_) => {}
            }
        }
        diff.added = later
            .entries
            .keys()
            .filter(|path| !self.entries.contains_key(*path))
            .cloned()
            .collect();
        diff
    }
}

fn walk(root: &Path, dir: &Path, entries: &mut BTreeMap<PathBuf, SnapshotEntry>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
            .to_path_buf();
        if entry.file_type()?.is_dir() {
            entries.insert(relative, SnapshotEntry::Directory);
            walk(root, &path, entries)?;
        } else {
            entries.insert(relative, SnapshotEntry::File(fs::read(&path)?));
        }
    }
    Ok(())
}
