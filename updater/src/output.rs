//! User-facing progress lines and summaries.
//!
//! Library code never prints directly. Progress goes to an injected writer
//! (stderr in the binary) so tests can capture it and `--quiet` can silence
//! it without touching the `log` diagnostics.

use std::fmt::Display;
use std::io::Write;

use crate::orchestrator::{LauncherCheck, SyncReport};

/// Writes one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Writes a progress line unless `quiet` is set.
pub fn progress(stderr: &mut dyn Write, quiet: bool, message: impl Display) {
    if !quiet {
        write_stderr_line(stderr, message);
    }
}

/// Formats the result of `lodestone check`.
///
/// # Examples
///
/// ```
/// use lodestone_common::ReleaseTag;
/// use lodestone_updater::orchestrator::{LauncherCheck, UpdateDecision};
/// use lodestone_updater::output::check_summary;
///
/// let check = LauncherCheck {
///     running: "1.0.0".to_owned(),
///     resolved: ReleaseTag::from("v1.1.0"),
///     decision: UpdateDecision::Install,
/// };
/// assert_eq!(
///     check_summary(&check),
///     "running 1.0.0, latest v1.1.0: update available"
/// );
/// ```
#[must_use]
pub fn check_summary(check: &LauncherCheck) -> String {
    format!(
        "running {}, latest {}: {}",
        check.running, check.resolved, check.decision
    )
}

/// Formats the outcome of `lodestone sync`.
#[must_use]
pub fn sync_summary(pack: &str, report: &SyncReport) -> String {
    format!("{pack}: {report}")
}
