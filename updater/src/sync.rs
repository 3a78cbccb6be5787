//! The external content-sync collaborator.
//!
//! Syncing the content tree is delegated to a packwiz-compatible installer.
//! The updater only needs pass or fail, so [`ContentSyncer`] reduces the
//! collaborator to that.

use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

/// Why the collaborator did not report success.
#[derive(Debug, Error)]
pub enum SyncerError {
    /// The program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Failed {
        /// Program name.
        program: String,
        /// Exit status.
        status: ExitStatus,
    },

    /// The program ran past its timeout and was killed.
    #[error("{program} timed out after {seconds}s")]
    TimedOut {
        /// Program name.
        program: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Waiting for the program failed.
    #[error("failed to wait for {program}: {source}")]
    Wait {
        /// Program name.
        program: String,
        /// The wait error.
        #[source]
        source: std::io::Error,
    },
}

/// Brings a content tree in line with a remote manifest.
#[cfg_attr(test, mockall::automock)]
pub trait ContentSyncer {
    /// Syncs `content_root` against `manifest_url`.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncerError`] when the collaborator fails.
    fn sync(&self, content_root: &Path, manifest_url: &str) -> Result<(), SyncerError>;
}

/// Runs a command such as `java -jar packwiz-installer-bootstrap.jar`.
///
/// The manifest URL is appended as `-g <url>` and the content root is the
/// working directory.
#[derive(Clone, Debug)]
pub struct CommandSyncer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSyncer {
    /// Builds a syncer from `command` (program then arguments). Returns
    /// `None` when `command` is empty.
    #[must_use]
    pub fn from_command(command: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

impl fmt::Display for CommandSyncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl ContentSyncer for CommandSyncer {
    fn sync(&self, content_root: &Path, manifest_url: &str) -> Result<(), SyncerError> {
        let spawn_error = |source: std::io::Error| SyncerError::Spawn {
            program: self.program.clone(),
            source,
        };
        std::fs::create_dir_all(content_root).map_err(spawn_error)?;

        log::info!("running {self} -g {manifest_url} in {}", content_root.display());
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-g")
            .arg(manifest_url)
            .current_dir(content_root)
            .stdin(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;

        let wait_error = |source: std::io::Error| SyncerError::Wait {
            program: self.program.clone(),
            source,
        };
        match child.wait_timeout(self.timeout).map_err(wait_error)? {
            Some(status) if status.success() => Ok(()),
            Some(status) => Err(SyncerError::Failed {
                program: self.program.clone(),
                status,
            }),
            None => {
                if let Err(err) = child.kill() {
                    log::warn!("failed to kill {}: {err}", self.program);
                }
                child.wait().map_err(wait_error)?;
                Err(SyncerError::TimedOut {
                    program: self.program.clone(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}
