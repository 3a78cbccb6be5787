//! Shared building blocks for Lodestone crates: release identifier ordering,
//! pack slug naming, content-tree copying and snapshot-based test support.

pub mod slug;
pub mod test_support;
pub mod tree;
pub mod version;

pub use slug::{DEFAULT_SLUG, backup_prefix, lock_file_name, marker_file_name, slugify};
pub use tree::{copy_entry, remove_entry};
pub use version::{
    ReleaseTag, SemanticCore, build_metadata_of, compare_prerelease, compare_semver,
    is_development_build, is_prerelease, normalize, parse_core, prerelease_of,
};
