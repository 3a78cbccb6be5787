//! Updater configuration loaded from `lodestone.toml`.
//!
//! Every discovery, update and sync call receives its settings from an
//! [`UpdaterConfig`] value rather than process-wide state. The file is
//! located through `--config`, then `LODESTONE_CONFIG`, then the platform
//! configuration directory. A missing file at the default location yields
//! the built-in defaults, which configure no packs.

use camino::{Utf8Path, Utf8PathBuf};
use lodestone_common::slug::slugify;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::backup::PackLayout;
use crate::dirs::{BaseDirs, utf8_dir};
use crate::error::ConfigError;
use crate::release::{Channel, ReleaseTarget};
use crate::retry::RetryPolicy;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "LODESTONE_CONFIG";
/// Environment variable forcing cache-busted manifest fetches.
pub const CACHE_BUST_ENV: &str = "LODESTONE_CACHEBUST";
/// File name looked up in the platform configuration directory.
pub const CONFIG_FILE_NAME: &str = "lodestone.toml";

/// Items backed up for a pack when none are configured.
pub const DEFAULT_TRACKED_ITEMS: [&str; 4] = ["mods", "config", "resourcepacks", "shaderpacks"];

/// Complete updater configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UpdaterConfig {
    /// Self-update settings.
    pub launcher: LauncherSettings,
    /// Backup retention settings.
    pub backups: BackupSettings,
    /// Content-sync collaborator settings.
    pub sync: SyncSettings,
    /// Managed packs.
    pub packs: Vec<PackConfig>,
}

/// Where releases are published and how to fetch them.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherSettings {
    /// Base URL of the release host.
    pub base_url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Asset file name published with each release.
    pub asset_name: String,
    /// Default channel preference.
    pub channel: Channel,
    /// Listing pages examined before giving up on a stable release.
    pub max_pages: u32,
    /// Timeout in seconds for listings, existence checks and manifests.
    pub timeout_secs: u64,
    /// Timeout in seconds for executable downloads.
    pub download_timeout_secs: u64,
    /// Overrides the default `User-Agent` header.
    pub user_agent: Option<String>,
    /// Retry behaviour for discovery and download.
    pub retry: RetrySettings,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_owned(),
            owner: "lodestone-launcher".to_owned(),
            repo: "lodestone".to_owned(),
            asset_name: default_asset_name(),
            channel: Channel::default(),
            max_pages: 10,
            timeout_secs: 30,
            download_timeout_secs: 60,
            user_agent: None,
            retry: RetrySettings::default(),
        }
    }
}

impl LauncherSettings {
    /// Returns the release coordinates used by discovery.
    #[must_use]
    pub fn target(&self) -> ReleaseTarget {
        ReleaseTarget {
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            asset_name: self.asset_name.clone(),
        }
    }

    /// Timeout applied to listing, HEAD and manifest requests.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout applied to executable downloads.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Bounded exponential backoff for network operations.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 1,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetrySettings {
    /// Builds the runtime retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

/// Backup storage and retention.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BackupSettings {
    /// Backups root; defaults to `<data dir>/backups`.
    pub root: Option<Utf8PathBuf>,
    /// Backups retained per pack.
    pub keep: usize,
    /// Refuse to sync when the pre-sync backup cannot be created.
    pub require_backup: bool,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            root: None,
            keep: 3,
            require_backup: false,
        }
    }
}

impl BackupSettings {
    /// Returns the validated retention policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `keep` is zero.
    pub fn retention(&self) -> Result<RetentionPolicy, ConfigError> {
        RetentionPolicy::new(self.keep)
    }

    /// Resolves the backups root, falling back to the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error when no root is configured and the data directory is
    /// unavailable or not UTF-8.
    pub fn resolve_root(&self, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf, ConfigError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(utf8_dir(dirs.data_dir(), "data")?.join("backups")),
        }
    }
}

/// Maximum number of backups kept per pack (always at least one).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    keep: NonZeroUsize,
}

impl RetentionPolicy {
    /// Creates a policy keeping `keep` backups.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `keep` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone_updater::config::RetentionPolicy;
    ///
    /// assert_eq!(RetentionPolicy::new(3).map(|p| p.keep()).ok(), Some(3));
    /// assert!(RetentionPolicy::new(0).is_err());
    /// ```
    pub fn new(keep: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(keep)
            .map(|keep| Self { keep })
            .ok_or_else(|| ConfigError::Invalid {
                reason: "backups.keep must be at least 1".to_owned(),
            })
    }

    /// Number of backups to keep.
    #[must_use]
    pub fn keep(self) -> usize {
        self.keep.get()
    }
}

/// How the content-sync collaborator is invoked.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Program and leading arguments; `-g <manifest-url>` is appended.
    pub command: Vec<String>,
    /// Seconds to wait for the collaborator before killing it.
    pub timeout_secs: u64,
    /// Append a `cb=<unix-seconds>` query parameter to manifest fetches.
    pub cache_bust: bool,
    /// Run the collaborator even when the pack is already current.
    pub verify_when_current: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            command: vec![
                "java".to_owned(),
                "-jar".to_owned(),
                "packwiz-installer-bootstrap.jar".to_owned(),
            ],
            timeout_secs: 600,
            cache_bust: false,
            verify_when_current: false,
        }
    }
}

impl SyncSettings {
    /// Collaborator timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A managed content pack.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackConfig {
    /// Stable identifier; slugified for file names.
    pub id: String,
    /// Name shown to users.
    #[serde(default)]
    pub display_name: Option<String>,
    /// URL of the remote `pack.toml`.
    pub manifest_url: String,
    /// Root of the installed content tree.
    pub content_dir: Utf8PathBuf,
    /// Directory holding the version marker; defaults to `content_dir`.
    #[serde(default)]
    pub marker_dir: Option<Utf8PathBuf>,
    /// Names of the directories below `content_dir` that are backed up.
    #[serde(default = "default_tracked_items")]
    pub tracked_items: Vec<String>,
}

impl PackConfig {
    /// Filesystem-safe form of [`Self::id`].
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.id)
    }

    /// Name shown to users.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// Resolves the on-disk layout of this pack below `backups_root`.
    #[must_use]
    pub fn layout(&self, backups_root: &Utf8Path) -> PackLayout {
        let marker_dir = self.marker_dir.as_ref().unwrap_or(&self.content_dir);
        PackLayout::new(
            self.slug(),
            PathBuf::from(self.content_dir.as_std_path()),
            PathBuf::from(marker_dir.as_std_path()),
            self.tracked_items.clone(),
            PathBuf::from(backups_root.as_std_path()),
        )
    }
}

fn default_tracked_items() -> Vec<String> {
    DEFAULT_TRACKED_ITEMS.iter().map(|item| (*item).to_owned()).collect()
}

/// Asset file name for the host platform, for example `lodestone-linux`.
#[must_use]
pub fn default_asset_name() -> String {
    format!(
        "lodestone-{}{}",
        std::env::consts::OS,
        std::env::consts::EXE_SUFFIX
    )
}

impl UpdaterConfig {
    /// Loads and validates configuration.
    ///
    /// `explicit` takes precedence over `LODESTONE_CONFIG`, which takes
    /// precedence over `<config dir>/lodestone.toml`. An explicitly named
    /// file must exist; the default file may be absent. `LODESTONE_CACHEBUST`
    /// set to `1` or `true` enables cache busting regardless of the file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed, or
    /// when validation fails.
    pub fn load(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from);
        let mut config = match explicit.map(Utf8Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = utf8_dir(dirs.config_dir(), "config")?.join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("no configuration at {path}; using defaults");
                    Self::default()
                }
            }
        };

        if cache_bust_forced() {
            config.sync.cache_bust = true;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backups.retention()?;
        let launcher = &self.launcher;
        if launcher.max_pages == 0 {
            return Err(invalid("launcher.max_pages must be at least 1"));
        }
        for (name, value) in [
            ("launcher.owner", &launcher.owner),
            ("launcher.repo", &launcher.repo),
            ("launcher.asset_name", &launcher.asset_name),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(&format!("{name} must not be empty")));
            }
        }
        if self
            .sync
            .command
            .first()
            .is_none_or(|program| program.trim().is_empty())
        {
            return Err(invalid("sync.command must name a program"));
        }

        let mut slugs = BTreeSet::new();
        for pack in &self.packs {
            if pack.manifest_url.trim().is_empty() {
                return Err(invalid(&format!("pack {} has an empty manifest_url", pack.id)));
            }
            if !slugs.insert(pack.slug()) {
                return Err(invalid(&format!(
                    "pack id {} collides with another pack (slug {})",
                    pack.id,
                    pack.slug()
                )));
            }
        }
        Ok(())
    }

    /// Looks up a pack by identifier or slug.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPack`] when no pack matches.
    pub fn pack(&self, id: &str) -> Result<&PackConfig, ConfigError> {
        let wanted = slugify(id);
        self.packs
            .iter()
            .find(|pack| pack.id == id || pack.slug() == wanted)
            .ok_or_else(|| ConfigError::UnknownPack { id: id.to_owned() })
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

fn cache_bust_forced() -> bool {
    std::env::var(CACHE_BUST_ENV)
        .is_ok_and(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
