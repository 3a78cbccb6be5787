//! Directory resolution abstraction for platform-specific paths.
//!
//! Configuration and backups default to the per-user directories reported by
//! `directories-next`. The [`BaseDirs`] trait lets tests substitute
//! temporary directories.

use camino::Utf8PathBuf;
use directories_next::ProjectDirs;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Supplies the platform directories Lodestone stores state in.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory holding `lodestone.toml`.
    fn config_dir(&self) -> Option<PathBuf>;

    /// Directory holding persistent data such as backups.
    fn data_dir(&self) -> Option<PathBuf>;
}

/// Resolves directories using the host platform's conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl SystemBaseDirs {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("io", "Lodestone", "lodestone")
    }
}

impl BaseDirs for SystemBaseDirs {
    fn config_dir(&self) -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn data_dir(&self) -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }
}

/// Converts an optional platform directory into a UTF-8 path.
///
/// # Errors
///
/// Returns [`ConfigError::MissingDirectory`] when the directory is unknown,
/// and [`ConfigError::Invalid`] when it is not valid UTF-8.
pub fn utf8_dir(dir: Option<PathBuf>, kind: &'static str) -> Result<Utf8PathBuf, ConfigError> {
    let dir = dir.ok_or(ConfigError::MissingDirectory { kind })?;
    Utf8PathBuf::from_path_buf(dir).map_err(|path| ConfigError::Invalid {
        reason: format!("{kind} directory is not valid UTF-8: {}", path.display()),
    })
}
