//! The self-replace state machine.
//!
//! `Idle -> Downloaded -> HandoffStarted -> Finalizing -> Done`. The first
//! two transitions run in the old process; the last two run in the staged
//! executable after [`SelfReplace::for_handoff`] rebuilds the machine from
//! the cleanup flags. A failed download or handoff returns to `Idle`.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::thread;

use super::download::AssetDownloader;
use super::finalize::{FinalizeOptions, FinalizeOutcome};
use super::platform::{ExecutableFs, ProcessLauncher, handoff_args, staged_path};
use crate::error::{DownloadError, ReplaceError};

/// Position in the replacement protocol.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplaceState {
    /// Nothing staged.
    Idle,
    /// The new executable is staged at `<exe>.new`.
    Downloaded,
    /// The staged executable has been started in cleanup mode.
    HandoffStarted,
    /// The staged executable is moving itself into place.
    Finalizing,
    /// The launcher has been relaunched.
    Done,
}

/// Drives one replacement of `current_exe`.
pub struct SelfReplace<'a> {
    current_exe: PathBuf,
    staged: PathBuf,
    state: ReplaceState,
    fs: &'a dyn ExecutableFs,
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> SelfReplace<'a> {
    /// Starts a replacement of `current_exe` in the `Idle` state.
    #[must_use]
    pub fn new(
        current_exe: PathBuf,
        fs: &'a dyn ExecutableFs,
        launcher: &'a dyn ProcessLauncher,
    ) -> Self {
        let staged = staged_path(&current_exe);
        Self {
            current_exe,
            staged,
            state: ReplaceState::Idle,
            fs,
            launcher,
        }
    }

    /// Resumes inside the staged executable from the cleanup flags.
    #[must_use]
    pub fn for_handoff(
        old_exe: PathBuf,
        new_exe: PathBuf,
        fs: &'a dyn ExecutableFs,
        launcher: &'a dyn ProcessLauncher,
    ) -> Self {
        Self {
            current_exe: old_exe,
            staged: new_exe,
            state: ReplaceState::HandoffStarted,
            fs,
            launcher,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReplaceState {
        self.state
    }

    /// Path the replacement is staged at.
    #[must_use]
    pub fn staged(&self) -> &Path {
        &self.staged
    }

    /// `Idle -> Downloaded`: fetches `url` and stages it as executable.
    ///
    /// The body is written to a temporary file beside the executable and
    /// only renamed to `<exe>.new` once complete.
    ///
    /// # Errors
    ///
    /// Returns [`ReplaceError::DownloadFailed`], leaving the machine `Idle`
    /// with nothing staged, or [`ReplaceError::InvalidTransition`].
    pub fn download(
        &mut self,
        downloader: &dyn AssetDownloader,
        url: &str,
    ) -> Result<u64, ReplaceError> {
        self.expect_state(ReplaceState::Idle, "download")?;
        let failed = |source: DownloadError| ReplaceError::DownloadFailed {
            url: url.to_owned(),
            source,
        };

        let dir = self
            .current_exe
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let partial = tempfile::Builder::new()
            .prefix(".lodestone-download-")
            .tempfile_in(dir)
            .map_err(|err| failed(err.into()))?
            .into_temp_path();

        let bytes = downloader.download(url, &partial).map_err(failed)?;
        self.fs
            .set_executable(&partial)
            .map_err(|err| failed(err.into()))?;
        if self.fs.exists(&self.staged) {
            debug!("removing stale {}", self.staged.display());
            self.fs
                .remove(&self.staged)
                .map_err(|err| failed(err.into()))?;
        }
        self.fs
            .rename(&partial, &self.staged)
            .map_err(|err| failed(err.into()))?;

        info!("staged {bytes} bytes at {}", self.staged.display());
        self.state = ReplaceState::Downloaded;
        Ok(bytes)
    }

    /// `Downloaded -> HandoffStarted`: starts the staged executable in
    /// cleanup mode. The caller should exit promptly afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ReplaceError::HandoffFailed`] after deleting the staged
    /// file and returning to `Idle`, or [`ReplaceError::InvalidTransition`].
    pub fn start_handoff(&mut self) -> Result<(), ReplaceError> {
        self.expect_state(ReplaceState::Downloaded, "start the handoff")?;
        let args = handoff_args(&self.current_exe, &self.staged);
        if let Err(source) = self.launcher.spawn_detached(&self.staged, &args) {
            if let Err(err) = self.fs.remove(&self.staged) {
                warn!("failed to remove {}: {err}", self.staged.display());
            }
            self.state = ReplaceState::Idle;
            return Err(ReplaceError::HandoffFailed {
                path: self.staged.clone(),
                source,
            });
        }
        info!("handed off to {}", self.staged.display());
        self.state = ReplaceState::HandoffStarted;
        Ok(())
    }

    /// `HandoffStarted -> Finalizing -> Done`: moves the staged executable
    /// into place and relaunches the launcher.
    ///
    /// Falls back from rename to copy-then-delete, and finally to abandoning
    /// the update. An abandoned update keeps the staged file, since a failed
    /// copy may already have damaged the old executable.
    ///
    /// # Errors
    ///
    /// Returns [`ReplaceError::FinalizeFailed`] only when the launcher
    /// cannot be relaunched at all, or [`ReplaceError::InvalidTransition`].
    pub fn finalize(&mut self, options: &FinalizeOptions) -> Result<FinalizeOutcome, ReplaceError> {
        self.expect_state(ReplaceState::HandoffStarted, "finalize")?;
        self.state = ReplaceState::Finalizing;
        thread::sleep(options.settle_delay);

        let outcome = if self.rename_with_retries(options) {
            FinalizeOutcome::Replaced
        } else if self.copy_into_place() {
            FinalizeOutcome::Copied
        } else {
            // The failed copy may have truncated the old executable.
            warn!("keeping {} after the failed update", self.staged.display());
            FinalizeOutcome::Reverted
        };

        self.relaunch(outcome)?;
        info!("{}: {outcome}", self.current_exe.display());
        self.state = ReplaceState::Done;
        Ok(outcome)
    }

    /// Starts the launcher again, falling back to the kept staged binary
    /// when a reverted update left the old path unlaunchable.
    fn relaunch(&self, outcome: FinalizeOutcome) -> Result<(), ReplaceError> {
        let Err(err) = self.launcher.spawn_detached(&self.current_exe, &[]) else {
            return Ok(());
        };
        if outcome == FinalizeOutcome::Reverted && self.fs.exists(&self.staged) {
            warn!(
                "could not relaunch {}: {err}; starting {} instead",
                self.current_exe.display(),
                self.staged.display()
            );
            return self
                .launcher
                .spawn_detached(&self.staged, &[])
                .map_err(|fallback| ReplaceError::FinalizeFailed {
                    path: self.staged.clone(),
                    reason: format!("could not relaunch after {outcome}: {err}; {fallback}"),
                });
        }
        Err(ReplaceError::FinalizeFailed {
            path: self.current_exe.clone(),
            reason: format!("could not relaunch after {outcome}: {err}"),
        })
    }

    fn rename_with_retries(&self, options: &FinalizeOptions) -> bool {
        let attempts = options.rename_attempts.max(1);
        for attempt in 1..=attempts {
            match self.fs.rename(&self.staged, &self.current_exe) {
                Ok(()) => return true,
                Err(err) => {
                    warn!(
                        "rename attempt {attempt}/{attempts} of {} failed: {err}",
                        self.staged.display()
                    );
                    if attempt < attempts {
                        thread::sleep(options.retry_delay);
                    }
                }
            }
        }
        false
    }

    fn copy_into_place(&self) -> bool {
        if let Err(err) = self.fs.copy(&self.staged, &self.current_exe) {
            warn!(
                "copying {} over {} failed: {err}",
                self.staged.display(),
                self.current_exe.display()
            );
            return false;
        }
        if let Err(err) = self.fs.remove(&self.staged) {
            warn!("failed to remove {}: {err}", self.staged.display());
        }
        true
    }

    fn expect_state(&self, expected: ReplaceState, action: &'static str) -> Result<(), ReplaceError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ReplaceError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::download::MockAssetDownloader;
    use crate::replace::platform::{CLEANUP_FLAG, MockExecutableFs, MockProcessLauncher, SystemFs};
    use mockall::Sequence;
    use std::fs;
    use std::io;
    use tempfile::tempdir;

    fn locked() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "file is locked")
    }

    #[test]
    fn download_stages_executable_next_to_current() {
        let dir = tempdir().expect("temp dir");
        let exe = dir.path().join("lodestone");
        fs::write(&exe, "old").expect("exe");
        fs::write(staged_path(&exe), "stale").expect("stale staged file");
        let mut downloader = MockAssetDownloader::new();
        downloader.expect_download().returning(|_, dest| {
            fs::write(dest, "new binary")?;
            Ok(10)
        });
        let launcher = MockProcessLauncher::new();
        let mut replace = SelfReplace::new(exe.clone(), &SystemFs, &launcher);

        let bytes = replace
            .download(&downloader, "https://x.test/lodestone")
            .expect("download");

        assert_eq!(bytes, 10);
        assert_eq!(replace.state(), ReplaceState::Downloaded);
        assert_eq!(fs::read_to_string(replace.staged()).expect("staged"), "new binary");
        assert_eq!(fs::read_to_string(&exe).expect("exe"), "old");
        let leftovers = fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(leftovers, 2, "only the executable and its staged copy remain");
    }

    #[test]
    fn failed_download_returns_to_idle_without_staging() {
        let dir = tempdir().expect("temp dir");
        let exe = dir.path().join("lodestone");
        let mut downloader = MockAssetDownloader::new();
        downloader.expect_download().returning(|url, _| {
            Err(DownloadError::NotFound {
                url: url.to_owned(),
            })
        });
        let launcher = MockProcessLauncher::new();
        let mut replace = SelfReplace::new(exe, &SystemFs, &launcher);

        let err = replace
            .download(&downloader, "https://x.test/missing")
            .expect_err("404");

        assert!(matches!(err, ReplaceError::DownloadFailed { .. }));
        assert_eq!(replace.state(), ReplaceState::Idle);
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn handoff_passes_cleanup_flags_to_staged_executable() {
        let mut fs_mock = MockExecutableFs::new();
        fs_mock.expect_remove().never();
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .withf(|program, args| {
                program == Path::new("/opt/lodestone.new")
                    && args.first().is_some_and(|flag| flag == CLEANUP_FLAG)
                    && args.len() == 5
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let mut replace = SelfReplace {
            current_exe: PathBuf::from("/opt/lodestone"),
            staged: PathBuf::from("/opt/lodestone.new"),
            state: ReplaceState::Downloaded,
            fs: &fs_mock,
            launcher: &launcher,
        };

        replace.start_handoff().expect("handoff");
        assert_eq!(replace.state(), ReplaceState::HandoffStarted);
    }

    #[test]
    fn failed_handoff_cleans_up_and_returns_to_idle() {
        let mut fs_mock = MockExecutableFs::new();
        fs_mock.expect_remove().times(1).returning(|_| Ok(()));
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .returning(|_, _| Err(io::Error::new(io::ErrorKind::NotFound, "gone")));
        let mut replace = SelfReplace {
            current_exe: PathBuf::from("/opt/lodestone"),
            staged: PathBuf::from("/opt/lodestone.new"),
            state: ReplaceState::Downloaded,
            fs: &fs_mock,
            launcher: &launcher,
        };

        let err = replace.start_handoff().expect_err("spawn fails");
        assert!(matches!(err, ReplaceError::HandoffFailed { .. }));
        assert_eq!(replace.state(), ReplaceState::Idle);
    }

    #[test]
    fn finalize_retries_rename_then_copies() {
        let mut seq = Sequence::new();
        let mut fs_mock = MockExecutableFs::new();
        fs_mock
            .expect_rename()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(locked()));
        fs_mock
            .expect_copy()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        fs_mock
            .expect_remove()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .withf(|program, args| program == Path::new("/opt/lodestone") && args.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));
        let mut replace = SelfReplace::for_handoff(
            PathBuf::from("/opt/lodestone"),
            PathBuf::from("/opt/lodestone.new"),
            &fs_mock,
            &launcher,
        );

        let outcome = replace
            .finalize(&FinalizeOptions::immediate(3))
            .expect("finalize");

        assert_eq!(outcome, FinalizeOutcome::Copied);
        assert_eq!(replace.state(), ReplaceState::Done);
    }

    #[test]
    fn finalize_reports_failure_when_relaunch_fails() {
        let mut fs_mock = MockExecutableFs::new();
        fs_mock.expect_rename().returning(|_, _| Err(locked()));
        fs_mock.expect_copy().returning(|_, _| Err(locked()));
        fs_mock.expect_remove().never();
        fs_mock.expect_exists().returning(|_| false);
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .returning(|_, _| Err(io::Error::new(io::ErrorKind::NotFound, "gone")));
        let mut replace = SelfReplace::for_handoff(
            PathBuf::from("/opt/lodestone"),
            PathBuf::from("/opt/lodestone.new"),
            &fs_mock,
            &launcher,
        );

        let err = replace
            .finalize(&FinalizeOptions::immediate(1))
            .expect_err("fatal");

        assert!(matches!(err, ReplaceError::FinalizeFailed { .. }));
        assert!(err.to_string().contains("previous version kept"));
    }

    #[test]
    fn reverted_update_starts_staged_binary_when_old_one_will_not_launch() {
        let mut fs_mock = MockExecutableFs::new();
        fs_mock.expect_rename().returning(|_, _| Err(locked()));
        fs_mock.expect_copy().returning(|_, _| Err(locked()));
        fs_mock.expect_remove().never();
        fs_mock.expect_exists().returning(|_| true);
        let mut seq = Sequence::new();
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .withf(|program, _| program == Path::new("/opt/lodestone"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(io::Error::other("exec format error")));
        launcher
            .expect_spawn_detached()
            .withf(|program, args| program == Path::new("/opt/lodestone.new") && args.is_empty())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let mut replace = SelfReplace::for_handoff(
            PathBuf::from("/opt/lodestone"),
            PathBuf::from("/opt/lodestone.new"),
            &fs_mock,
            &launcher,
        );

        let outcome = replace
            .finalize(&FinalizeOptions::immediate(1))
            .expect("staged binary relaunched");

        assert_eq!(outcome, FinalizeOutcome::Reverted);
        assert_eq!(replace.state(), ReplaceState::Done);
    }

    /// Renames fail and copies truncate the destination before failing.
    struct TruncatingFs;

    impl ExecutableFs for TruncatingFs {
        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(locked())
        }

        fn copy(&self, _from: &Path, to: &Path) -> io::Result<()> {
            fs::write(to, "")?;
            Err(io::Error::other("no space left on device"))
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            fs::remove_file(path)
        }

        fn exists(&self, path: &Path) -> bool {
            path.exists()
        }

        fn set_executable(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn interrupted_copy_keeps_staged_binary() {
        let dir = tempdir().expect("temp dir");
        let exe = dir.path().join("lodestone");
        let staged = staged_path(&exe);
        fs::write(&exe, "old binary").expect("exe");
        fs::write(&staged, "new binary").expect("staged");
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_spawn_detached()
            .times(1)
            .returning(|_, _| Ok(()));
        let mut replace =
            SelfReplace::for_handoff(exe.clone(), staged.clone(), &TruncatingFs, &launcher);

        let outcome = replace
            .finalize(&FinalizeOptions::immediate(2))
            .expect("finalize");

        assert_eq!(outcome, FinalizeOutcome::Reverted);
        assert_eq!(fs::read_to_string(&exe).expect("exe"), "");
        assert_eq!(
            fs::read_to_string(&staged).expect("staged binary survives"),
            "new binary"
        );
    }

    #[test]
    fn transitions_out_of_order_are_rejected() {
        let fs_mock = MockExecutableFs::new();
        let launcher = MockProcessLauncher::new();
        let mut replace = SelfReplace::new(PathBuf::from("/opt/lodestone"), &fs_mock, &launcher);

        let err = replace
            .finalize(&FinalizeOptions::immediate(1))
            .expect_err("idle");
        assert!(matches!(
            err,
            ReplaceError::InvalidTransition {
                state: ReplaceState::Idle,
                action: "finalize"
            }
        ));
        assert!(replace.start_handoff().is_err());
    }
}
