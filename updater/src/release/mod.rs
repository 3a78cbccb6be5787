//! Release discovery for the launcher executable.
//!
//! - [`channel`] - stable or prerelease preference
//! - [`source`] - the listing abstraction and its scraping implementation
//! - [`discovery`] - paginated tag resolution plus asset verification
//! - [`asset`] - deterministic asset URL construction

pub mod asset;
pub mod channel;
pub mod discovery;
pub mod source;

pub use asset::{Asset, asset_url};
pub use channel::Channel;
pub use discovery::{ResolvedRelease, resolve};
pub use source::{HttpReleaseSource, ReleaseSource};

/// Where a launcher's releases are published.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseTarget {
    /// Base URL of the release host, without a trailing slash.
    pub base_url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Asset file name attached to each release.
    pub asset_name: String,
}

impl ReleaseTarget {
    /// URL of the `page`th release listing page.
    #[must_use]
    pub fn listing_url(&self, page: u32) -> String {
        format!(
            "{}/{}/{}/releases?page={page}",
            self.base_url, self.owner, self.repo
        )
    }
}
