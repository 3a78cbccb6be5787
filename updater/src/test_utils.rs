//! Shared test doubles for the updater crate.
//!
//! Enabled for unit tests and, through the `test-support` feature, for the
//! behaviour suites under `tests/`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::config::{CACHE_BUST_ENV, CONFIG_ENV};
use crate::content::{ManifestFetcher, PackManifest};
use crate::error::{DiscoveryError, DownloadError, SyncError};
use crate::release::ReleaseSource;
use crate::replace::{AssetDownloader, ExecutableFs, ProcessLauncher};
use crate::sync::{ContentSyncer, SyncerError};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Runs `f` with `LODESTONE_CONFIG` set to `path` (or unset) and
/// `LODESTONE_CACHEBUST` cleared.
pub fn with_config_env<R>(path: Option<&str>, f: impl FnOnce() -> R) -> R {
    temp_env::with_vars([(CONFIG_ENV, path), (CACHE_BUST_ENV, None)], f)
}

/// A release listing served from fixed pages.
#[derive(Debug, Default)]
pub struct StubReleaseSource {
    pages: Vec<Vec<String>>,
    assets_exist: bool,
    transient_failures: Cell<u32>,
    page_calls: RefCell<Vec<u32>>,
    head_calls: RefCell<Vec<String>>,
}

impl StubReleaseSource {
    /// Serves `pages` in order; later pages are empty. Every asset exists.
    #[must_use]
    pub fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|page| page.iter().map(|tag| (*tag).to_owned()).collect())
                .collect(),
            assets_exist: true,
            ..Self::default()
        }
    }

    /// Reports every asset as missing.
    #[must_use]
    pub fn without_assets(mut self) -> Self {
        self.assets_exist = false;
        self
    }

    /// Fails the next `count` listing requests with a network error.
    #[must_use]
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.set(count);
        self
    }

    /// Pages requested so far, in order.
    #[must_use]
    pub fn page_calls(&self) -> Vec<u32> {
        self.page_calls.borrow().clone()
    }

    /// Asset URLs checked so far.
    #[must_use]
    pub fn head_calls(&self) -> Vec<String> {
        self.head_calls.borrow().clone()
    }
}

impl ReleaseSource for StubReleaseSource {
    fn list_tags(&self, page: u32) -> Result<Vec<String>, DiscoveryError> {
        self.page_calls.borrow_mut().push(page);
        let remaining = self.transient_failures.get();
        if remaining > 0 {
            self.transient_failures.set(remaining - 1);
            return Err(DiscoveryError::NetworkFailure {
                url: format!("stub://releases?page={page}"),
                reason: "connection reset".to_owned(),
            });
        }
        let index = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX);
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    fn asset_exists(&self, url: &str) -> Result<bool, DiscoveryError> {
        self.head_calls.borrow_mut().push(url.to_owned());
        Ok(self.assets_exist)
    }
}

/// A manifest endpoint whose version can change between calls.
#[derive(Debug, Default)]
pub struct StubManifestFetcher {
    version: RefCell<Option<String>>,
    calls: Cell<usize>,
}

impl StubManifestFetcher {
    /// Serves a manifest publishing `version`.
    #[must_use]
    pub fn with_version(version: &str) -> Self {
        Self {
            version: RefCell::new(Some(version.to_owned())),
            calls: Cell::new(0),
        }
    }

    /// Fails every fetch.
    #[must_use]
    pub fn failing() -> Self {
        Self::default()
    }

    /// Changes the published version.
    pub fn set_version(&self, version: &str) {
        *self.version.borrow_mut() = Some(version.to_owned());
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ManifestFetcher for StubManifestFetcher {
    fn fetch(&self, url: &str) -> Result<PackManifest, SyncError> {
        self.calls.set(self.calls.get() + 1);
        let version = self
            .version
            .borrow()
            .clone()
            .ok_or_else(|| SyncError::ManifestFetchFailed {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            })?;
        Ok(PackManifest {
            name: Some("Stub Pack".to_owned()),
            author: None,
            version,
            pack_format: Some("packwiz:1.1.0".to_owned()),
            versions: BTreeMap::new(),
        })
    }
}

/// A filesystem-operation kind that [`ScriptedFs`] can fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FsOp {
    /// [`ExecutableFs::rename`].
    Rename,
    /// [`ExecutableFs::copy`].
    Copy,
    /// [`ExecutableFs::remove`].
    Remove,
}

/// Real filesystem operations with scripted failures, simulating a locked
/// executable.
#[derive(Debug, Default)]
pub struct ScriptedFs {
    rename_failures: Cell<u32>,
    copy_failures: Cell<u32>,
    remove_failures: Cell<u32>,
    log: RefCell<Vec<String>>,
}

impl ScriptedFs {
    /// Creates a filesystem that never fails on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `count` calls of `op` with `PermissionDenied`.
    #[must_use]
    pub fn failing(self, op: FsOp, count: u32) -> Self {
        self.counter(op).set(count);
        self
    }

    /// Operations performed so far, as `"rename ok"`, `"copy failed"` and
    /// so on.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn counter(&self, op: FsOp) -> &Cell<u32> {
        match op {
            FsOp::Rename => &self.rename_failures,
            FsOp::Copy => &self.copy_failures,
            FsOp::Remove => &self.remove_failures,
        }
    }

    fn run(&self, op: FsOp, name: &str, action: impl FnOnce() -> io::Result<()>) -> io::Result<()> {
        let counter = self.counter(op);
        let result = if counter.get() > 0 {
            counter.set(counter.get() - 1);
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is locked by another process",
            ))
        } else {
            action()
        };
        let verdict = if result.is_ok() { "ok" } else { "failed" };
        self.log.borrow_mut().push(format!("{name} {verdict}"));
        result
    }
}

impl ExecutableFs for ScriptedFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.run(FsOp::Rename, "rename", || fs::rename(from, to))
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.run(FsOp::Copy, "copy", || fs::copy(from, to).map(|_| ()))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.run(FsOp::Remove, "remove", || fs::remove_file(path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn set_executable(&self, path: &Path) -> io::Result<()> {
        fs::metadata(path).map(|_| ())
    }
}

/// Records detached spawns instead of starting processes.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    fail: Cell<bool>,
    spawned: RefCell<Vec<(PathBuf, Vec<OsString>)>>,
}

impl RecordingLauncher {
    /// Creates a launcher whose spawns succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every spawn fail.
    #[must_use]
    pub fn failing() -> Self {
        let launcher = Self::default();
        launcher.fail.set(true);
        launcher
    }

    /// Programs and arguments spawned so far.
    #[must_use]
    pub fn spawned(&self) -> Vec<(PathBuf, Vec<OsString>)> {
        self.spawned.borrow().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> io::Result<()> {
        if self.fail.get() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "program not found"));
        }
        self.spawned
            .borrow_mut()
            .push((program.to_path_buf(), args.to_vec()));
        Ok(())
    }
}

/// A content-sync collaborator that writes fixed files and can fail.
#[derive(Debug, Default)]
pub struct StubSyncer {
    fail: Cell<bool>,
    writes: Vec<(String, String)>,
    calls: RefCell<Vec<(PathBuf, String)>>,
}

impl StubSyncer {
    /// Creates a syncer that succeeds without touching the tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `contents` to `relative` under the content root on each run,
    /// before reporting success or failure.
    #[must_use]
    pub fn writing(mut self, relative: &str, contents: &str) -> Self {
        self.writes.push((relative.to_owned(), contents.to_owned()));
        self
    }

    /// Makes subsequent runs fail (after their writes).
    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }

    /// Content roots and manifest URLs of every run.
    #[must_use]
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.borrow().clone()
    }
}

impl ContentSyncer for StubSyncer {
    fn sync(&self, content_root: &Path, manifest_url: &str) -> Result<(), SyncerError> {
        self.calls
            .borrow_mut()
            .push((content_root.to_path_buf(), manifest_url.to_owned()));
        let spawn_error = |source: io::Error| SyncerError::Spawn {
            program: "stub-syncer".to_owned(),
            source,
        };
        for (relative, contents) in &self.writes {
            let path = content_root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(spawn_error)?;
            }
            fs::write(&path, contents).map_err(spawn_error)?;
        }
        if self.fail.get() {
            return Err(SyncerError::Failed {
                program: "stub-syncer".to_owned(),
                status: exit_status(1),
            });
        }
        Ok(())
    }
}

/// An asset downloader serving a fixed body.
#[derive(Debug, Default)]
pub struct StubDownloader {
    body: Vec<u8>,
    missing: bool,
    transient_failures: Cell<u32>,
    calls: Cell<u32>,
}

impl StubDownloader {
    /// Serves `body` for every URL.
    #[must_use]
    pub fn serving(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            ..Self::default()
        }
    }

    /// Answers every request with 404.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    /// Fails the next `count` requests with a transport error.
    #[must_use]
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.set(count);
        self
    }

    /// Number of download attempts so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl AssetDownloader for StubDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        self.calls.set(self.calls.get() + 1);
        if self.missing {
            return Err(DownloadError::NotFound {
                url: url.to_owned(),
            });
        }
        let remaining = self.transient_failures.get();
        if remaining > 0 {
            self.transient_failures.set(remaining - 1);
            return Err(DownloadError::HttpError {
                url: url.to_owned(),
                reason: "connection reset".to_owned(),
            });
        }
        fs::write(dest, &self.body)?;
        Ok(u64::try_from(self.body.len()).unwrap_or(u64::MAX))
    }
}
