//! Tuning and results of the finalizing step.

use std::fmt;
use std::time::Duration;

/// Timing of the finalizing step run by the staged executable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FinalizeOptions {
    /// Pause before the first rename so the old process can exit.
    pub settle_delay: Duration,
    /// Rename attempts before falling back to copying.
    pub rename_attempts: u32,
    /// Pause between rename attempts.
    pub retry_delay: Duration,
}

impl Default for FinalizeOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            rename_attempts: 5,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl FinalizeOptions {
    /// Options with no pauses, for tests and already-exited parents.
    #[must_use]
    pub const fn immediate(rename_attempts: u32) -> Self {
        Self {
            settle_delay: Duration::ZERO,
            rename_attempts,
            retry_delay: Duration::ZERO,
        }
    }
}

/// How the staged executable ended up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FinalizeOutcome {
    /// The staged file was renamed over the old executable.
    Replaced,
    /// Renaming failed; the staged file was copied over and deleted.
    Copied,
    /// Both failed; the old executable was relaunched and the staged file
    /// kept until the next update replaces it.
    Reverted,
}

impl fmt::Display for FinalizeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replaced => "replaced by rename",
            Self::Copied => "replaced by copy",
            Self::Reverted => "update abandoned; previous version kept",
        })
    }
}
