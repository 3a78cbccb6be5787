//! Error types for the Lodestone updater.
//!
//! Each concern owns an enum so callers can match on the precise failure:
//! discovery, download, self-replacement, content sync and configuration.
//! [`UpdaterError`] aggregates them for the binary, which maps each family to
//! a distinct process exit code.

use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

use crate::replace::ReplaceState;

/// Failures while locating a release and its asset.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The listing contained no release tags at all.
    #[error("no releases found for {owner}/{repo}")]
    NoReleaseFound {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
    },

    /// Only prerelease tags were seen within the page budget.
    #[error("no stable release found for {owner}/{repo} after checking {pages} pages")]
    NoStableReleaseFound {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Number of listing pages examined.
        pages: u32,
    },

    /// The chosen release does not publish the expected asset.
    #[error("asset {asset} not found for release {tag} at {url}")]
    AssetNotFound {
        /// The release tag that was resolved.
        tag: String,
        /// The asset file name that was expected.
        asset: String,
        /// The URL that failed the existence check.
        url: String,
    },

    /// A listing or existence-check request failed in transit.
    #[error("network failure fetching {url}: {reason}")]
    NetworkFailure {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

impl DiscoveryError {
    /// Returns `true` when retrying the same request may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone_updater::error::DiscoveryError;
    ///
    /// let err = DiscoveryError::NetworkFailure {
    ///     url: "https://example.test".to_owned(),
    ///     reason: "timed out".to_owned(),
    /// };
    /// assert!(err.is_transient());
    /// ```
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. })
    }
}

/// Errors arising from HTTP transfers.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("resource not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while replacing the running executable.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// The new executable could not be downloaded and staged.
    #[error("failed to download {url}: {source}")]
    DownloadFailed {
        /// The asset URL.
        url: String,
        /// The underlying transfer error.
        #[source]
        source: DownloadError,
    },

    /// The staged executable could not be started in cleanup mode.
    #[error("failed to start staged executable {path}: {source}")]
    HandoffFailed {
        /// Path of the staged executable.
        path: PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Every fallback failed, including relaunching the old executable.
    #[error("could not finish replacing {path}: {reason}")]
    FinalizeFailed {
        /// Path of the executable being replaced.
        path: PathBuf,
        /// Description of the last failure.
        reason: String,
    },

    /// An operation was requested in a state that does not permit it.
    #[error("cannot {action} while self-replace is {state:?}")]
    InvalidTransition {
        /// The state the machine was in.
        state: ReplaceState,
        /// The attempted action.
        action: &'static str,
    },
}

impl ReplaceError {
    /// Returns `true` when retrying the download may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed {
                source: DownloadError::HttpError { .. },
                ..
            }
        )
    }
}

/// Failures while checking, backing up, syncing or restoring a pack.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote manifest could not be fetched or lacked a version.
    #[error("failed to fetch manifest {url}: {reason}")]
    ManifestFetchFailed {
        /// Manifest URL.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// The requested backup does not exist.
    #[error("no backup available at {path}")]
    NoBackupAvailable {
        /// Path where a backup was expected.
        path: PathBuf,
    },

    /// The backup exists but holds none of the tracked items.
    #[error("backup {path} contains none of the tracked items")]
    NothingToRestore {
        /// Path of the empty backup.
        path: PathBuf,
    },

    /// Creating a backup failed.
    #[error("failed to create backup at {path}: {source}")]
    BackupFailed {
        /// Backup directory that was being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Copying a backup back into place failed.
    #[error("failed to restore backup {path}: {source}")]
    RestoreFailed {
        /// Backup directory being restored.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The content-sync collaborator reported failure.
    #[error("sync of {pack} failed: {reason} (previous content restored: {restored})")]
    SyncFailed {
        /// Pack identifier.
        pack: String,
        /// Collaborator failure description.
        reason: String,
        /// Whether the pre-sync backup was restored.
        restored: bool,
    },

    /// Another process holds the pack lock.
    #[error("pack is locked by another process: {path}")]
    Locked {
        /// Lock file path.
        path: PathBuf,
    },

    /// Reading or writing pack state failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Failures while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// The TOML parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A value failed validation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Description of the invalid value.
        reason: String,
    },

    /// No pack with the requested identifier is configured.
    #[error("no pack named {id} is configured")]
    UnknownPack {
        /// The requested identifier.
        id: String,
    },

    /// A platform directory could not be determined.
    #[error("could not determine the {kind} directory")]
    MissingDirectory {
        /// Which directory was needed.
        kind: &'static str,
    },
}

/// Errors surfaced by the updater library and binary.
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// Release discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Self-replacement failed.
    #[error(transparent)]
    Replace(#[from] ReplaceError),

    /// Content sync, backup or restore failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl UpdaterError {
    /// Maps the error family to the binary's process exit code.
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone_updater::error::{ConfigError, UpdaterError};
    ///
    /// let err = UpdaterError::from(ConfigError::UnknownPack { id: "x".to_owned() });
    /// assert_eq!(err.exit_code(), 2);
    /// ```
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Discovery(_) => 3,
            Self::Replace(_) => 4,
            Self::Sync(_) => 5,
            Self::Io(_) | Self::WriteFailed { .. } => 1,
        }
    }
}

/// Result type alias using [`UpdaterError`].
pub type Result<T> = std::result::Result<T, UpdaterError>;
