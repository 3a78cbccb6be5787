//! Release listings as a source of tags.
//!
//! Releases are discovered by scanning the public HTML listing rather than
//! an authenticated API, which avoids rate limits. [`ReleaseSource`] hides
//! the scraping so discovery can be exercised against fixed pages.

use regex::Regex;
use std::collections::HashSet;

use super::ReleaseTarget;
use crate::error::{DiscoveryError, DownloadError};
use crate::http::HttpClient;

/// A paginated listing of release tags.
///
/// Implementations must return each page's tags newest first, and pages
/// must be ordered newest first too. Discovery relies on this order and
/// does not re-sort: a source that violates it may cause a stale release to
/// be chosen.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseSource {
    /// Returns the tags listed on `page` (1-based), newest first.
    ///
    /// An empty vector means the page exists but lists no releases.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NetworkFailure`] when the page cannot be
    /// fetched.
    fn list_tags(&self, page: u32) -> Result<Vec<String>, DiscoveryError>;

    /// Returns `true` when `url` answers a HEAD request with status 200.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NetworkFailure`] when no response arrives.
    fn asset_exists(&self, url: &str) -> Result<bool, DiscoveryError>;
}

/// Scrapes the public release listing over HTTP.
#[derive(Debug)]
pub struct HttpReleaseSource {
    client: HttpClient,
    target: ReleaseTarget,
    tag_pattern: Regex,
}

impl HttpReleaseSource {
    /// Creates a source for `target` using `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag pattern cannot be compiled, which only
    /// happens for pathological owner or repository names.
    pub fn new(client: HttpClient, target: ReleaseTarget) -> Result<Self, regex::Error> {
        let tag_pattern = tag_pattern(&target.owner, &target.repo)?;
        Ok(Self {
            client,
            target,
            tag_pattern,
        })
    }
}

impl ReleaseSource for HttpReleaseSource {
    fn list_tags(&self, page: u32) -> Result<Vec<String>, DiscoveryError> {
        let url = self.target.listing_url(page);
        log::debug!("fetching release listing {url}");
        let body = self
            .client
            .get_text(&url, &[])
            .map_err(|err| network_failure(&url, &err))?;
        let tags = extract_tags_with(&self.tag_pattern, &body);
        log::debug!("page {page} lists {} tags", tags.len());
        Ok(tags)
    }

    fn asset_exists(&self, url: &str) -> Result<bool, DiscoveryError> {
        let status = self
            .client
            .head_status(url)
            .map_err(|err| network_failure(url, &err))?;
        log::debug!("HEAD {url} returned {status}");
        Ok(status == 200)
    }
}

fn network_failure(url: &str, err: &DownloadError) -> DiscoveryError {
    DiscoveryError::NetworkFailure {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

fn tag_pattern(owner: &str, repo: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"/{}/{}/releases/tag/([^"'?#<>\s]+)"#,
        regex::escape(owner),
        regex::escape(repo)
    ))
}

/// Extracts release tags referenced by `html`, in document order.
///
/// Each tag appears once, at the position of its first reference.
///
/// # Errors
///
/// Returns an error only if the pattern built from `owner` and `repo` fails
/// to compile.
///
/// # Examples
///
/// ```
/// use lodestone_updater::release::source::extract_tags;
///
/// let html = r#"<a href="/o/r/releases/tag/v2.0.0">v2</a>
///               <a href="/o/r/releases/tag/v1.9.0">v1.9</a>
///               <a href="/o/r/releases/tag/v2.0.0">again</a>"#;
/// let tags = extract_tags(html, "o", "r").expect("valid pattern");
/// assert_eq!(tags, ["v2.0.0", "v1.9.0"]);
/// ```
pub fn extract_tags(html: &str, owner: &str, repo: &str) -> Result<Vec<String>, regex::Error> {
    Ok(extract_tags_with(&tag_pattern(owner, repo)?, html))
}

fn extract_tags_with(pattern: &Regex, html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    pattern
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|tag| tag.as_str().to_owned())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
