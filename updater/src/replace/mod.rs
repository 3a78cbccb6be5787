//! Replacement of the running launcher executable.
//!
//! The protocol runs across two process generations. The running (old)
//! process downloads the new binary to `<exe>.new` and starts it detached
//! with the cleanup flags, then exits. The new process waits for the old
//! executable to be released, moves itself into place and relaunches the
//! launcher. Every filesystem and process primitive goes through
//! [`ExecutableFs`] and [`ProcessLauncher`] so the fallback chain can be
//! tested without real executables.
//!
//! - [`state`] - the [`SelfReplace`] state machine
//! - [`finalize`] - options and outcomes of the finalizing step
//! - [`platform`] - filesystem and process primitives
//! - [`download`] - asset download abstraction

pub mod download;
pub mod finalize;
pub mod platform;
pub mod state;

pub use download::{AssetDownloader, HttpDownloader};
pub use finalize::{FinalizeOptions, FinalizeOutcome};
pub use platform::{
    CLEANUP_FLAG, ExecutableFs, NEW_EXE_FLAG, OLD_EXE_FLAG, ProcessLauncher, SystemFs,
    SystemLauncher, handoff_args, staged_path,
};
pub use state::{ReplaceState, SelfReplace};
