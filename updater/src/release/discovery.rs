//! Resolves the release to install under a channel preference.
//!
//! The prerelease channel only inspects the first listing page and takes
//! its newest tag. The stable channel walks pages in order, skipping
//! prerelease tags, and fails with a dedicated error rather than ever
//! falling back to a prerelease. Once a tag is chosen, its asset is checked
//! with a HEAD request before the result is returned.

use lodestone_common::ReleaseTag;
use log::{debug, info};

use super::ReleaseTarget;
use super::asset::{Asset, asset_url};
use super::channel::Channel;
use super::source::ReleaseSource;
use crate::error::DiscoveryError;

/// A release tag together with its verified asset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedRelease {
    /// The chosen tag, as listed.
    pub tag: ReleaseTag,
    /// The asset published with that tag.
    pub asset: Asset,
}

/// Resolves a release of `target` from `source`.
///
/// `max_pages` bounds the stable search; the prerelease channel reads a
/// single page regardless.
///
/// # Errors
///
/// - [`DiscoveryError::NoReleaseFound`] when no page listed any tag.
/// - [`DiscoveryError::NoStableReleaseFound`] when only prerelease tags were
///   seen within `max_pages` pages.
/// - [`DiscoveryError::AssetNotFound`] when the chosen tag lacks the asset.
/// - [`DiscoveryError::NetworkFailure`] from the source, unchanged.
pub fn resolve(
    source: &dyn ReleaseSource,
    target: &ReleaseTarget,
    channel: Channel,
    max_pages: u32,
) -> Result<ResolvedRelease, DiscoveryError> {
    let tag = match channel {
        Channel::PreferPrerelease => newest_tag(source, target)?,
        Channel::PreferStable => newest_stable_tag(source, target, max_pages)?,
    };

    let url = asset_url(target, tag.as_str());
    if !source.asset_exists(&url)? {
        return Err(DiscoveryError::AssetNotFound {
            tag: tag.as_str().to_owned(),
            asset: target.asset_name.clone(),
            url,
        });
    }

    info!("resolved {channel} release {tag} with asset {url}");
    Ok(ResolvedRelease {
        tag,
        asset: Asset {
            name: target.asset_name.clone(),
            url,
        },
    })
}

fn newest_tag(
    source: &dyn ReleaseSource,
    target: &ReleaseTarget,
) -> Result<ReleaseTag, DiscoveryError> {
    source
        .list_tags(1)?
        .into_iter()
        .next()
        .map(ReleaseTag::from)
        .ok_or_else(|| no_release(target))
}

fn newest_stable_tag(
    source: &dyn ReleaseSource,
    target: &ReleaseTarget,
    max_pages: u32,
) -> Result<ReleaseTag, DiscoveryError> {
    let mut saw_any_tag = false;
    for page in 1..=max_pages {
        let tags = source.list_tags(page)?;
        saw_any_tag |= !tags.is_empty();
        if let Some(stable) = tags
            .into_iter()
            .map(ReleaseTag::from)
            .find(|tag| !tag.is_prerelease())
        {
            return Ok(stable);
        }
        debug!("no stable release on page {page}");
    }

    if saw_any_tag {
        Err(DiscoveryError::NoStableReleaseFound {
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            pages: max_pages,
        })
    } else {
        Err(no_release(target))
    }
}

fn no_release(target: &ReleaseTarget) -> DiscoveryError {
    DiscoveryError::NoReleaseFound {
        owner: target.owner.clone(),
        repo: target.repo.clone(),
    }
}
