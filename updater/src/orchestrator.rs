//! Composes discovery, self-replacement, version tracking and backups into
//! the two user-facing flows: updating the launcher and syncing a pack.
//!
//! All collaborators arrive as trait objects in [`Collaborators`], and all
//! settings come from the [`UpdaterConfig`] passed to
//! [`Orchestrator::new`].

use camino::Utf8PathBuf;
use lodestone_common::{ReleaseTag, is_development_build};
use log::{info, warn};
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use crate::backup::{
    BackupOutcome, BackupRecord, PackLayout, RestoreReport, create_backup, describe_backup,
    latest_backup, list_backups, restore_backup,
};
use crate::config::{PackConfig, UpdaterConfig};
use crate::content::{ContentStatus, ManifestFetcher, check_update, commit};
use crate::error::{DiscoveryError, ReplaceError, Result, SyncError};
use crate::lock::PackLock;
use crate::output::progress;
use crate::release::{Channel, ReleaseSource, ResolvedRelease, resolve};
use crate::replace::{AssetDownloader, ExecutableFs, ProcessLauncher, SelfReplace};
use crate::sync::ContentSyncer;

/// The external services and platform primitives the flows depend on.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Release listing.
    pub releases: &'a dyn ReleaseSource,
    /// Asset downloads.
    pub downloader: &'a dyn AssetDownloader,
    /// Remote pack manifests.
    pub manifests: &'a dyn ManifestFetcher,
    /// Content-sync collaborator.
    pub syncer: &'a dyn ContentSyncer,
    /// Executable file operations.
    pub fs: &'a dyn ExecutableFs,
    /// Detached process spawning.
    pub launcher: &'a dyn ProcessLauncher,
}

/// What to do about a resolved release.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateDecision {
    /// The release should be installed.
    Install,
    /// The running version equals the release.
    UpToDate,
    /// The running version is newer; downgrades need `--force`.
    LocalNewer,
    /// The running binary is a development build.
    DevelopmentBuild,
}

impl fmt::Display for UpdateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Install => "update available",
            Self::UpToDate => "up to date",
            Self::LocalNewer => "running version is newer than the latest release",
            Self::DevelopmentBuild => "development build; updates are skipped",
        })
    }
}

/// Decides whether `tag` should replace the `running` version.
///
/// `force` always installs. Otherwise development builds are never
/// replaced, and the release must rank above the running version.
///
/// # Examples
///
/// ```
/// use lodestone_common::ReleaseTag;
/// use lodestone_updater::orchestrator::{UpdateDecision, decide};
///
/// let tag = ReleaseTag::from("v1.9.0");
/// assert_eq!(decide("1.8.2", &tag, false), UpdateDecision::Install);
/// assert_eq!(decide("1.9.0", &tag, false), UpdateDecision::UpToDate);
/// assert_eq!(decide("2.0.0", &tag, false), UpdateDecision::LocalNewer);
/// assert_eq!(decide("2.0.0", &tag, true), UpdateDecision::Install);
/// assert_eq!(decide("dev", &tag, false), UpdateDecision::DevelopmentBuild);
/// ```
#[must_use]
pub fn decide(running: &str, tag: &ReleaseTag, force: bool) -> UpdateDecision {
    if force {
        return UpdateDecision::Install;
    }
    if is_development_build(running) {
        return UpdateDecision::DevelopmentBuild;
    }
    match tag.precedence_cmp(running) {
        Ordering::Greater => UpdateDecision::Install,
        Ordering::Equal => UpdateDecision::UpToDate,
        Ordering::Less => UpdateDecision::LocalNewer,
    }
}

/// Result of a launcher update check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LauncherCheck {
    /// Version of the running binary.
    pub running: String,
    /// Newest release on the requested channel.
    pub resolved: ReleaseTag,
    /// What an update would do.
    pub decision: UpdateDecision,
}

/// Result of a launcher update.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LauncherUpdate {
    /// Already running the resolved release.
    UpToDate {
        /// The resolved release.
        tag: ReleaseTag,
    },
    /// Running something newer than the resolved release.
    LocalNewer {
        /// The resolved release.
        tag: ReleaseTag,
    },
    /// Running a development build; nothing was fetched.
    DevelopmentBuild,
    /// The new binary is staged and running in cleanup mode; the caller
    /// should exit.
    HandoffStarted {
        /// The release being installed.
        tag: ReleaseTag,
    },
}

impl fmt::Display for LauncherUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { tag } => write!(f, "already running {tag}"),
            Self::LocalNewer { tag } => {
                write!(f, "running version is newer than {tag}; use --force to downgrade")
            }
            Self::DevelopmentBuild => f.write_str("development build; use --force to update"),
            Self::HandoffStarted { tag } => write!(f, "installing {tag}; restarting"),
        }
    }
}

/// Result of syncing a pack.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncReport {
    /// Nothing to do; `verified` is set when the collaborator still ran.
    UpToDate {
        /// The installed version.
        version: String,
        /// Whether a verification run was performed.
        verified: bool,
    },
    /// First installation.
    Installed {
        /// The installed version.
        version: String,
    },
    /// An existing installation was updated.
    Updated {
        /// Previously installed version.
        from: String,
        /// Newly installed version.
        to: String,
        /// The backup taken before syncing, if one was made.
        backup: Option<String>,
    },
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate {
                version,
                verified: false,
            } => write!(f, "up to date at {version}"),
            Self::UpToDate {
                version,
                verified: true,
            } => write!(f, "up to date at {version} (verified)"),
            Self::Installed { version } => write!(f, "installed {version}"),
            Self::Updated { from, to, .. } => write!(f, "updated {from} -> {to}"),
        }
    }
}

/// Runs the launcher-update and pack-sync flows.
pub struct Orchestrator<'a> {
    config: &'a UpdaterConfig,
    backups_root: Utf8PathBuf,
    deps: Collaborators<'a>,
    quiet: bool,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator storing backups under `backups_root`.
    #[must_use]
    pub fn new(
        config: &'a UpdaterConfig,
        backups_root: Utf8PathBuf,
        deps: Collaborators<'a>,
        quiet: bool,
    ) -> Self {
        Self {
            config,
            backups_root,
            deps,
            quiet,
        }
    }

    /// Resolves the newest release and reports what an update would do.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::UpdaterError::Discovery`] when no release can
    /// be resolved.
    pub fn check_launcher_update(&self, running: &str, channel: Channel) -> Result<LauncherCheck> {
        let resolved = self.resolve_release(channel)?;
        let decision = decide(running, &resolved.tag, false);
        Ok(LauncherCheck {
            running: running.to_owned(),
            resolved: resolved.tag,
            decision,
        })
    }

    /// Updates the launcher at `current_exe` when a newer release exists.
    ///
    /// On [`LauncherUpdate::HandoffStarted`] the replacement is running and
    /// the caller must exit so its executable can be replaced.
    ///
    /// # Errors
    ///
    /// Returns discovery errors unchanged and [`ReplaceError`]s from the
    /// download or handoff. Neither leaves a staged file behind.
    pub fn update_launcher(
        &self,
        running: &str,
        channel: Channel,
        force: bool,
        current_exe: PathBuf,
        stderr: &mut dyn Write,
    ) -> Result<LauncherUpdate> {
        if !force && is_development_build(running) {
            info!("skipping update of development build {running}");
            return Ok(LauncherUpdate::DevelopmentBuild);
        }

        progress(stderr, self.quiet, format_args!("Checking for {channel} releases..."));
        let resolved = self.resolve_release(channel)?;
        let tag = resolved.tag;
        match decide(running, &tag, force) {
            UpdateDecision::Install => {}
            UpdateDecision::UpToDate => return Ok(LauncherUpdate::UpToDate { tag }),
            UpdateDecision::LocalNewer => return Ok(LauncherUpdate::LocalNewer { tag }),
            UpdateDecision::DevelopmentBuild => return Ok(LauncherUpdate::DevelopmentBuild),
        }

        progress(stderr, self.quiet, format_args!("Downloading {tag}..."));
        let mut machine = SelfReplace::new(current_exe, self.deps.fs, self.deps.launcher);
        self.config.launcher.retry.policy().run(ReplaceError::is_transient, || {
            machine.download(self.deps.downloader, &resolved.asset.url)
        })?;
        machine.start_handoff()?;
        info!("handoff to {tag} started");
        Ok(LauncherUpdate::HandoffStarted { tag })
    }

    fn resolve_release(&self, channel: Channel) -> std::result::Result<ResolvedRelease, DiscoveryError> {
        let launcher = &self.config.launcher;
        let target = launcher.target();
        launcher.retry.policy().run(DiscoveryError::is_transient, || {
            resolve(self.deps.releases, &target, channel, launcher.max_pages)
        })
    }

    /// Brings pack `id` in line with its remote manifest.
    ///
    /// An update is preceded by a backup, and a failed sync restores it.
    /// The marker only changes after the collaborator succeeds.
    ///
    /// # Errors
    ///
    /// Returns configuration errors for unknown packs, and
    /// [`SyncError::Locked`], [`SyncError::ManifestFetchFailed`] or
    /// [`SyncError::SyncFailed`] from the flow itself.
    pub fn sync_pack(&self, id: &str, stderr: &mut dyn Write) -> Result<SyncReport> {
        let pack = self.config.pack(id)?;
        let layout = self.layout(pack);
        let _lock = PackLock::acquire(&layout.backups_root, &layout.slug)?;

        let status = check_update(self.deps.manifests, &pack.manifest_url, &layout.marker_path)?;
        info!("{}: {status}", pack.display_name());
        let report = match status {
            ContentStatus::UpToDate { version } => {
                let verified = self.config.sync.verify_when_current;
                if verified {
                    progress(stderr, self.quiet, format_args!("Verifying {}...", pack.display_name()));
                    self.run_syncer(pack, &layout, None)?;
                }
                SyncReport::UpToDate { version, verified }
            }
            ContentStatus::NeedsInstall { remote } => {
                progress(
                    stderr,
                    self.quiet,
                    format_args!("Installing {} {remote}...", pack.display_name()),
                );
                self.run_syncer(pack, &layout, None)?;
                commit(&layout.marker_path, &remote)?;
                SyncReport::Installed { version: remote }
            }
            ContentStatus::NeedsUpdate { local, remote } => {
                progress(
                    stderr,
                    self.quiet,
                    format_args!("Updating {} {local} -> {remote}...", pack.display_name()),
                );
                let backup = self.backup_before_sync(&layout, stderr)?;
                self.run_syncer(pack, &layout, backup.as_ref())?;
                commit(&layout.marker_path, &remote)?;
                SyncReport::Updated {
                    from: local,
                    to: remote,
                    backup: backup.map(|record| record.id),
                }
            }
        };
        Ok(report)
    }

    fn backup_before_sync(
        &self,
        layout: &PackLayout,
        stderr: &mut dyn Write,
    ) -> Result<Option<BackupRecord>> {
        let retention = self.config.backups.retention()?;
        match create_backup(layout, retention) {
            Ok(BackupOutcome::Created(record)) => Ok(Some(record)),
            Ok(BackupOutcome::NoOp) => Ok(None),
            Err(err) if self.config.backups.require_backup => Err(err.into()),
            Err(err) => {
                warn!("continuing without a backup: {err}");
                progress(
                    stderr,
                    self.quiet,
                    format_args!("Warning: could not back up {}; continuing", layout.slug),
                );
                Ok(None)
            }
        }
    }

    /// Runs the collaborator; on failure restores `backup` when given.
    fn run_syncer(
        &self,
        pack: &PackConfig,
        layout: &PackLayout,
        backup: Option<&BackupRecord>,
    ) -> std::result::Result<(), SyncError> {
        let Err(err) = self
            .deps
            .syncer
            .sync(&layout.content_root, &pack.manifest_url)
        else {
            return Ok(());
        };

        let restored = backup.is_some_and(|record| match restore_backup(record, layout) {
            Ok(_) => true,
            Err(restore_err) => {
                warn!("failed to restore {} after a failed sync: {restore_err}", record.id);
                false
            }
        });
        Err(SyncError::SyncFailed {
            pack: pack.id.clone(),
            reason: err.to_string(),
            restored,
        })
    }

    /// Restores pack `id` from `backup_id`, or from its newest backup.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoBackupAvailable`] when the backup does not
    /// exist or belongs to another pack, plus the errors of
    /// [`restore_backup`].
    pub fn restore_pack(&self, id: &str, backup_id: Option<&str>) -> Result<RestoreReport> {
        let pack = self.config.pack(id)?;
        let layout = self.layout(pack);
        let _lock = PackLock::acquire(&layout.backups_root, &layout.slug)?;

        let record = match backup_id {
            Some(backup_id) => {
                let record = describe_backup(&layout, backup_id);
                if !layout.owns_backup(&record.id) {
                    return Err(SyncError::NoBackupAvailable { path: record.path }.into());
                }
                record
            }
            None => latest_backup(&layout)?.ok_or_else(|| SyncError::NoBackupAvailable {
                path: layout.backups_root.clone(),
            })?,
        };
        Ok(restore_backup(&record, &layout)?)
    }

    /// Lists pack `id`'s backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns configuration errors for unknown packs and I/O errors from
    /// listing.
    pub fn list_pack_backups(&self, id: &str) -> Result<Vec<BackupRecord>> {
        let pack = self.config.pack(id)?;
        Ok(list_backups(&self.layout(pack))?)
    }

    fn layout(&self, pack: &PackConfig) -> PackLayout {
        pack.layout(&self.backups_root)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
