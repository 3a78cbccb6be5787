//! Timestamped backups of a pack's mutable content.
//!
//! A backup is a directory `<slug>-backup-<timestamp>` under the backups
//! root holding copies of the tracked items (for example `mods` and
//! `config`) plus the version marker. New backups are written before old
//! ones are pruned, so a crash part-way through never leaves the pack with
//! fewer backups than it started with.

use chrono::{DateTime, NaiveDateTime, Utc};
use lodestone_common::slug::{backup_prefix, marker_file_name};
use lodestone_common::tree::{copy_entry, remove_entry};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::RetentionPolicy;
use crate::error::SyncError;

/// Timestamp layout of backup ids; zero-padded so name order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Length of a timestamp rendered with [`TIMESTAMP_FORMAT`].
const TIMESTAMP_LEN: usize = "2026-01-01-00-00-00".len();

/// Collision suffixes tried before giving up on a timestamp.
const MAX_COLLISION_SUFFIX: u32 = 1_000;

/// Where a pack's content, marker and backups live.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackLayout {
    /// Filesystem-safe pack name.
    pub slug: String,
    /// Root of the installed content tree.
    pub content_root: PathBuf,
    /// Path of the version marker file.
    pub marker_path: PathBuf,
    /// Names of the items below `content_root` that are backed up.
    pub tracked_items: Vec<String>,
    /// Directory holding every pack's backups.
    pub backups_root: PathBuf,
}

impl PackLayout {
    /// Creates a layout whose marker is `.<slug>-version` inside `marker_dir`.
    #[must_use]
    pub fn new(
        slug: String,
        content_root: PathBuf,
        marker_dir: PathBuf,
        tracked_items: Vec<String>,
        backups_root: PathBuf,
    ) -> Self {
        let marker_path = marker_dir.join(marker_file_name(&slug));
        Self {
            slug,
            content_root,
            marker_path,
            tracked_items,
            backups_root,
        }
    }

    /// File name the marker is stored under inside a backup.
    #[must_use]
    pub fn marker_name(&self) -> String {
        marker_file_name(&self.slug)
    }

    /// Resolves a backup id, accepting either the full directory name or
    /// only its timestamp.
    #[must_use]
    pub fn backup_path(&self, id: &str) -> PathBuf {
        let prefix = backup_prefix(&self.slug);
        if id.starts_with(&prefix) {
            self.backups_root.join(id)
        } else {
            self.backups_root.join(format!("{prefix}{id}"))
        }
    }

    /// Returns `true` when `name` is one of this pack's backup directories:
    /// the backup prefix, a timestamp, then an optional `-N` suffix.
    ///
    /// Packs whose slugs extend this one (`theboys-backup` next to
    /// `theboys`) share the prefix but never match.
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone_updater::backup::PackLayout;
    /// use std::path::PathBuf;
    ///
    /// let layout = PackLayout::new(
    ///     "theboys".to_owned(),
    ///     PathBuf::from("/srv/theboys"),
    ///     PathBuf::from("/srv/theboys"),
    ///     vec!["mods".to_owned()],
    ///     PathBuf::from("/srv/backups"),
    /// );
    /// assert!(layout.owns_backup("theboys-backup-2026-03-14-09-26-01"));
    /// assert!(layout.owns_backup("theboys-backup-2026-03-14-09-26-01-2"));
    /// assert!(!layout.owns_backup("theboys-backup-backup-2026-03-14-09-26-01"));
    /// ```
    #[must_use]
    pub fn owns_backup(&self, name: &str) -> bool {
        is_backup_of(&self.slug, name)
    }
}

fn is_backup_of(slug: &str, name: &str) -> bool {
    let Some(rest) = name.strip_prefix(&backup_prefix(slug)) else {
        return false;
    };
    let Some((stamp, suffix)) = rest.split_at_checked(TIMESTAMP_LEN) else {
        return false;
    };
    if NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_err() {
        return false;
    }
    suffix.is_empty()
        || suffix
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// A backup directory and what it holds.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BackupRecord {
    /// Directory name, `<slug>-backup-<timestamp>`.
    pub id: String,
    /// Absolute path of the directory.
    pub path: PathBuf,
    /// Tracked items present in the backup.
    pub items: BTreeSet<String>,
    /// Whether the version marker was captured.
    pub has_marker: bool,
}

/// Result of [`create_backup`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackupOutcome {
    /// A backup was written.
    Created(BackupRecord),
    /// None of the tracked items exist, so nothing was written.
    NoOp,
}

/// What [`restore_backup`] put back.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RestoreReport {
    /// The backup that was restored.
    pub backup_id: String,
    /// Tracked items copied back into the content tree.
    pub restored: BTreeSet<String>,
    /// Whether the marker was restored.
    pub marker_restored: bool,
}

/// Deletes all but the `keep` newest backups of `slug` under `root`.
///
/// Backups are ordered by name, newest first. A missing root is a no-op.
/// Failure to delete one backup is logged and the rest are still attempted.
///
/// # Errors
///
/// Returns an error when the backups root exists but cannot be listed.
pub fn prune(root: &Path, slug: &str, keep: usize) -> io::Result<Vec<PathBuf>> {
    prune_except(root, slug, keep, None)
}

fn prune_except(
    root: &Path,
    slug: &str,
    keep: usize,
    protected: Option<&str>,
) -> io::Result<Vec<PathBuf>> {
    let mut names = backup_names(root, slug)?;
    let mut budget = keep;
    if let Some(id) = protected {
        if names.iter().any(|name| name == id) {
            names.retain(|name| name != id);
            budget = budget.saturating_sub(1);
        }
    }

    let mut removed = Vec::new();
    for name in names.into_iter().skip(budget) {
        let path = root.join(&name);
        match remove_entry(&path) {
            Ok(()) => {
                debug!("pruned backup {}", path.display());
                removed.push(path);
            }
            Err(err) => warn!("failed to prune backup {}: {err}", path.display()),
        }
    }
    Ok(removed)
}

/// Backup directory names of `slug`, newest first.
fn backup_names(root: &Path, slug: &str) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_backup_of(slug, name) {
                names.push(name.to_owned());
            }
        }
    }
    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Snapshots the tracked items and marker of `layout`, then prunes.
///
/// # Errors
///
/// Returns [`SyncError::BackupFailed`] when the backup cannot be written.
/// Any partially written directory is removed first.
pub fn create_backup(
    layout: &PackLayout,
    retention: RetentionPolicy,
) -> Result<BackupOutcome, SyncError> {
    create_backup_at(layout, retention, Utc::now())
}

/// As [`create_backup`], with the timestamp supplied by the caller.
///
/// # Errors
///
/// Returns [`SyncError::BackupFailed`] when the backup cannot be written.
pub fn create_backup_at(
    layout: &PackLayout,
    retention: RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<BackupOutcome, SyncError> {
    let present: Vec<&String> = layout
        .tracked_items
        .iter()
        .filter(|item| exists(&layout.content_root.join(item.as_str())))
        .collect();
    if present.is_empty() {
        info!(
            "nothing to back up for {}: no tracked items under {}",
            layout.slug,
            layout.content_root.display()
        );
        return Ok(BackupOutcome::NoOp);
    }

    let failed = |path: &Path, source: io::Error| SyncError::BackupFailed {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(&layout.backups_root).map_err(|err| failed(&layout.backups_root, err))?;
    let (id, path) = allocate_backup_dir(layout, now).map_err(|err| failed(&layout.backups_root, err))?;

    let record = match fill_backup(layout, &present, &id, &path) {
        Ok(record) => record,
        Err(err) => {
            if let Err(cleanup) = remove_entry(&path) {
                warn!("failed to remove partial backup {}: {cleanup}", path.display());
            }
            return Err(failed(&path, err));
        }
    };
    info!("created backup {} with {} items", record.id, record.items.len());

    match prune_except(&layout.backups_root, &layout.slug, retention.keep(), Some(&id)) {
        Ok(removed) if !removed.is_empty() => {
            debug!("pruned {} old backups of {}", removed.len(), layout.slug);
        }
        Ok(_) => {}
        Err(err) => warn!("failed to prune backups of {}: {err}", layout.slug),
    }
    Ok(BackupOutcome::Created(record))
}

fn allocate_backup_dir(layout: &PackLayout, now: DateTime<Utc>) -> io::Result<(String, PathBuf)> {
    let base = format!(
        "{}{}",
        backup_prefix(&layout.slug),
        now.format(TIMESTAMP_FORMAT)
    );
    for suffix in 0..=MAX_COLLISION_SUFFIX {
        let id = if suffix == 0 {
            base.clone()
        } else {
            format!("{base}-{suffix}")
        };
        let path = layout.backups_root.join(&id);
        match fs::create_dir(&path) {
            Ok(()) => return Ok((id, path)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("too many backups named {base}"),
    ))
}

fn fill_backup(
    layout: &PackLayout,
    present: &[&String],
    id: &str,
    path: &Path,
) -> io::Result<BackupRecord> {
    let mut items = BTreeSet::new();
    for item in present {
        copy_entry(&layout.content_root.join(item.as_str()), &path.join(item.as_str()))?;
        items.insert((*item).clone());
    }

    let has_marker = exists(&layout.marker_path);
    if has_marker {
        copy_entry(&layout.marker_path, &path.join(layout.marker_name()))?;
    }

    Ok(BackupRecord {
        id: id.to_owned(),
        path: path.to_path_buf(),
        items,
        has_marker,
    })
}

/// Replaces the tracked items and marker of `layout` with `record`'s copies.
///
/// Every tracked item currently present is deleted before the backup's
/// items are copied back. When the backup holds no marker the current
/// marker is removed, so the next check treats the pack as needing sync.
///
/// # Errors
///
/// - [`SyncError::NoBackupAvailable`] when `record.path` does not exist;
///   nothing is touched.
/// - [`SyncError::NothingToRestore`] when the backup holds no tracked item;
///   nothing is touched.
/// - [`SyncError::RestoreFailed`] when deleting or copying fails.
pub fn restore_backup(
    record: &BackupRecord,
    layout: &PackLayout,
) -> Result<RestoreReport, SyncError> {
    if !record.path.is_dir() {
        return Err(SyncError::NoBackupAvailable {
            path: record.path.clone(),
        });
    }

    let available: BTreeSet<String> = layout
        .tracked_items
        .iter()
        .filter(|item| exists(&record.path.join(item.as_str())))
        .cloned()
        .collect();
    if available.is_empty() {
        return Err(SyncError::NothingToRestore {
            path: record.path.clone(),
        });
    }

    let failed = |source: io::Error| SyncError::RestoreFailed {
        path: record.path.clone(),
        source,
    };
    for item in &layout.tracked_items {
        remove_entry(&layout.content_root.join(item)).map_err(failed)?;
    }
    for item in &available {
        copy_entry(&record.path.join(item), &layout.content_root.join(item)).map_err(failed)?;
    }

    let backed_up_marker = record.path.join(layout.marker_name());
    let marker_restored = exists(&backed_up_marker);
    if marker_restored {
        copy_entry(&backed_up_marker, &layout.marker_path).map_err(failed)?;
    } else {
        remove_entry(&layout.marker_path).map_err(failed)?;
    }

    info!("restored {} from backup {}", layout.slug, record.id);
    Ok(RestoreReport {
        backup_id: record.id.clone(),
        restored: available,
        marker_restored,
    })
}

/// Lists the backups of `layout`'s pack, newest first.
///
/// # Errors
///
/// Returns [`SyncError::Io`] when the backups root cannot be listed.
pub fn list_backups(layout: &PackLayout) -> Result<Vec<BackupRecord>, SyncError> {
    let names = backup_names(&layout.backups_root, &layout.slug).map_err(|source| SyncError::Io {
        path: layout.backups_root.clone(),
        source,
    })?;
    Ok(names
        .into_iter()
        .map(|id| describe_backup(layout, &id))
        .collect())
}

/// Returns the newest backup of `layout`'s pack, if any.
///
/// # Errors
///
/// Returns [`SyncError::Io`] when the backups root cannot be listed.
pub fn latest_backup(layout: &PackLayout) -> Result<Option<BackupRecord>, SyncError> {
    Ok(list_backups(layout)?.into_iter().next())
}

/// Describes the backup named `id`, whether or not it exists on disk.
#[must_use]
pub fn describe_backup(layout: &PackLayout, id: &str) -> BackupRecord {
    let path = layout.backup_path(id);
    let items = layout
        .tracked_items
        .iter()
        .filter(|item| exists(&path.join(item.as_str())))
        .cloned()
        .collect();
    let has_marker = exists(&path.join(layout.marker_name()));
    let id = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(id)
        .to_owned();
    BackupRecord {
        id,
        path,
        items,
        has_marker,
    }
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
