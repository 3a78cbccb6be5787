//! Lodestone updater library.
//!
//! This crate keeps the Lodestone launcher and its managed packs current. It
//! resolves launcher releases by scraping the public release listing, swaps
//! the running executable through a two-process handoff, and syncs pack
//! content against a packwiz manifest behind a backup that is restored when
//! the sync fails. It is used by the `lodestone` binary and can be driven
//! programmatically with injected collaborators.
//!
//! # Modules
//!
//! - [`backup`] - Timestamped snapshots, restore and retention pruning
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `lodestone.toml` loading and validation
//! - [`content`] - Remote manifest fetching and local version markers
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types and exit-code mapping
//! - [`http`] - Blocking HTTP client with per-purpose timeouts
//! - [`list_output`] - Output formatting for backup listings
//! - [`lock`] - Per-pack advisory locking
//! - [`orchestrator`] - The launcher-update and pack-sync flows
//! - [`output`] - Progress lines and summaries
//! - [`release`] - Release discovery and channel selection
//! - [`replace`] - Self-replacement of the launcher executable
//! - [`retry`] - Backoff for transient network failures
//! - [`sync`] - The external content-sync collaborator

pub mod backup;
pub mod cli;
pub mod config;
pub mod content;
pub mod dirs;
pub mod error;
pub mod http;
pub mod list_output;
pub mod lock;
pub mod orchestrator;
pub mod output;
pub mod release;
pub mod replace;
pub mod retry;
pub mod sync;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

/// Version reported by this build.
///
/// Release pipelines set `LODESTONE_BUILD_VERSION` to the tag being built;
/// local builds fall back to the crate version.
pub const RUNNING_VERSION: &str = match option_env!("LODESTONE_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Returns [`RUNNING_VERSION`].
#[must_use]
pub const fn current_version() -> &'static str {
    RUNNING_VERSION
}
