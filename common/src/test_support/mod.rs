//! Shared test helpers for Lodestone crates.
//!
//! The helpers here are used from unit and behaviour tests that need to
//! prove a filesystem operation did, or did not, touch a content tree.

pub mod snapshot;

pub use snapshot::{DirSnapshot, SnapshotDiff};
