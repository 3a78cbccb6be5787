//! Asset URL construction.

use super::ReleaseTarget;

/// A release asset whose existence has been verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Asset {
    /// Asset file name.
    pub name: String,
    /// Download URL.
    pub url: String,
}

/// Builds `<base>/<owner>/<repo>/releases/download/<tag>/<asset>`.
///
/// The tag is used exactly as listed, including any `v` prefix and build
/// metadata.
///
/// # Examples
///
/// ```
/// use lodestone_updater::release::{ReleaseTarget, asset_url};
///
/// let target = ReleaseTarget {
///     base_url: "https://github.com".to_owned(),
///     owner: "lodestone-launcher".to_owned(),
///     repo: "lodestone".to_owned(),
///     asset_name: "lodestone-linux".to_owned(),
/// };
/// assert_eq!(
///     asset_url(&target, "v1.9.0"),
///     "https://github.com/lodestone-launcher/lodestone/releases/download/v1.9.0/lodestone-linux"
/// );
/// ```
#[must_use]
pub fn asset_url(target: &ReleaseTarget, tag: &str) -> String {
    format!(
        "{}/{}/{}/releases/download/{tag}/{}",
        target.base_url, target.owner, target.repo, target.asset_name
    )
}
