//! Per-pack advisory lock.
//!
//! Backup, restore and sync of one pack must not interleave across
//! processes. [`PackLock`] holds an exclusive `fs2` lock on
//! `<backups root>/.<slug>.lock` for as long as it lives; a second
//! acquisition fails immediately instead of waiting.

use fs2::FileExt;
use lodestone_common::slug::lock_file_name;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::SyncError;

/// An exclusive lock on one pack, released on drop.
#[derive(Debug)]
pub struct PackLock {
    file: File,
    path: PathBuf,
}

impl PackLock {
    /// Takes the lock for `slug` under `root`, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Locked`] when another holder has the lock and
    /// [`SyncError::Io`] when the lock file cannot be opened.
    pub fn acquire(root: &Path, slug: &str) -> Result<Self, SyncError> {
        let path = root.join(lock_file_name(slug));
        let io_error = |source: std::io::Error| SyncError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(root).map_err(io_error)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_error)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                log::debug!("acquired {}", path.display());
                Ok(Self { file, path })
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(SyncError::Locked { path })
            }
            Err(source) => Err(SyncError::Io { path, source }),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PackLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            log::warn!("failed to release {}: {err}", self.path.display());
        }
    }
}
