//! Platform primitives used during self-replacement.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Tells a spawned executable to run the finalizing step.
pub const CLEANUP_FLAG: &str = "--cleanup-after-update";
/// Precedes the path of the executable being replaced.
pub const OLD_EXE_FLAG: &str = "--cleanup-old-exe";
/// Precedes the path of the staged replacement.
pub const NEW_EXE_FLAG: &str = "--cleanup-new-exe";

/// Filesystem operations on executables.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutableFs {
    /// Renames `from` to `to`, replacing `to`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, for example when `to` is locked.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copies `from` over `to`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Returns `true` when `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Marks `path` as executable.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn set_executable(&self, path: &Path) -> io::Result<()>;
}

/// Starts processes that outlive the caller.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLauncher {
    /// Starts `program` with `args` and returns without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns the spawn error.
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> io::Result<()>;
}

/// [`ExecutableFs`] backed by `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemFs;

impl ExecutableFs for SystemFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(path, permissions)
    }

    #[cfg(not(unix))]
    fn set_executable(&self, path: &Path) -> io::Result<()> {
        fs::metadata(path).map(|_| ())
    }
}

/// [`ProcessLauncher`] backed by `std::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> io::Result<()> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);
        let child = command.spawn()?;
        log::debug!("started {} as process {}", program.display(), child.id());
        Ok(())
    }
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(windows))]
fn detach(_command: &mut Command) {}

/// Arguments passed to the staged executable to run the finalizing step.
#[must_use]
pub fn handoff_args(old_exe: &Path, new_exe: &Path) -> Vec<OsString> {
    vec![
        OsString::from(CLEANUP_FLAG),
        OsString::from(OLD_EXE_FLAG),
        old_exe.as_os_str().to_owned(),
        OsString::from(NEW_EXE_FLAG),
        new_exe.as_os_str().to_owned(),
    ]
}

/// Path the replacement is staged at: the executable path plus `.new`.
///
/// # Examples
///
/// ```
/// use lodestone_updater::replace::staged_path;
/// use std::path::Path;
///
/// assert_eq!(
///     staged_path(Path::new("/opt/lodestone/lodestone")),
///     Path::new("/opt/lodestone/lodestone.new")
/// );
/// ```
#[must_use]
pub fn staged_path(current_exe: &Path) -> PathBuf {
    let mut name = current_exe
        .file_name()
        .map_or_else(|| OsString::from("lodestone"), OsStr::to_owned);
    name.push(".new");
    current_exe.with_file_name(name)
}
