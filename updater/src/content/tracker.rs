//! Compares the remote manifest version with the local marker file.
//!
//! Versions are opaque strings compared for exact equality. The marker is a
//! single trimmed line and is only rewritten after a successful sync.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use super::manifest::ManifestFetcher;
use crate::error::SyncError;

/// Whether the local content tree matches the remote manifest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentStatus {
    /// No marker exists locally.
    NeedsInstall {
        /// Remote version.
        remote: String,
    },
    /// The marker records a different version.
    NeedsUpdate {
        /// Version recorded locally.
        local: String,
        /// Remote version.
        remote: String,
    },
    /// The marker matches the remote version.
    UpToDate {
        /// The shared version.
        version: String,
    },
}

impl ContentStatus {
    /// The remote version this status was computed against.
    #[must_use]
    pub fn remote_version(&self) -> &str {
        match self {
            Self::NeedsInstall { remote } | Self::NeedsUpdate { remote, .. } => remote,
            Self::UpToDate { version } => version,
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsInstall { remote } => write!(f, "not installed (remote {remote})"),
            Self::NeedsUpdate { local, remote } => write!(f, "update {local} -> {remote}"),
            Self::UpToDate { version } => write!(f, "up to date at {version}"),
        }
    }
}

/// Fetches the manifest at `manifest_url` and compares it with `marker`.
///
/// The manifest is fetched before the marker is read, so a network failure
/// is reported even when no marker exists.
///
/// # Errors
///
/// Returns [`SyncError::ManifestFetchFailed`] from the fetcher, or
/// [`SyncError::Io`] when the marker exists but cannot be read.
pub fn check_update(
    fetcher: &dyn ManifestFetcher,
    manifest_url: &str,
    marker: &Path,
) -> Result<ContentStatus, SyncError> {
    let remote = fetcher.fetch(manifest_url)?.version;
    let status = match read_marker(marker)? {
        None => ContentStatus::NeedsInstall { remote },
        Some(local) if local == remote => ContentStatus::UpToDate { version: local },
        Some(local) => ContentStatus::NeedsUpdate { local, remote },
    };
    log::debug!("{} is {status}", marker.display());
    Ok(status)
}

/// Reads the trimmed marker contents; absent or blank markers give `None`.
///
/// # Errors
///
/// Returns [`SyncError::Io`] for read failures other than absence.
pub fn read_marker(marker: &Path) -> Result<Option<String>, SyncError> {
    match fs::read_to_string(marker) {
        Ok(text) => {
            let trimmed = text.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SyncError::Io {
            path: marker.to_path_buf(),
            source,
        }),
    }
}

/// Records `version` in `marker` as one trimmed, newline-terminated line.
///
/// The file is replaced atomically so a crash never leaves a truncated
/// marker.
///
/// # Errors
///
/// Returns [`SyncError::Io`] when the marker cannot be written.
pub fn commit(marker: &Path, version: &str) -> Result<(), SyncError> {
    let io_error = |source: io::Error| SyncError::Io {
        path: marker.to_path_buf(),
        source,
    };
    let dir = marker
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_error)?;

    let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
    writeln!(staged, "{}", version.trim()).map_err(io_error)?;
    staged.as_file().sync_all().map_err(io_error)?;
    staged.persist(marker).map_err(|err| io_error(err.error))?;
    log::info!("recorded version {} in {}", version.trim(), marker.display());
    Ok(())
}
