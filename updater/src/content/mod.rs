//! Managed content version tracking.
//!
//! - [`manifest`] - fetching and parsing the remote `pack.toml`
//! - [`tracker`] - comparing the remote version with the local marker

pub mod manifest;
pub mod tracker;

pub use manifest::{HttpManifestFetcher, ManifestFetcher, PackManifest, cache_busted_url};
pub use tracker::{ContentStatus, check_update, commit, read_marker};
